use std::ops::Range;

use da2404::{
    configuration::RenderConfiguration,
    table::{Cell, StyleCommand, Table, TableStyle},
    template::{DocTemplate, Flowable, Story},
};
use rand::Rng;

struct FuzzStoriesConfiguration {
    stories_to_generate: u32,
    maximum_number_of_tables: usize,
    columns_range: Range<usize>,
    rows_range: Range<usize>,
    maximum_string_length: usize,
    column_width_range: Range<f32>,
}

#[test]
fn random_stories_render_and_load_back() {
    let configuration = FuzzStoriesConfiguration {
        stories_to_generate: 20,
        maximum_number_of_tables: 12,
        columns_range: 1..6,
        rows_range: 1..4,
        maximum_string_length: 30,
        column_width_range: 10.0..120.0,
    };
    let mut rng = rand::thread_rng();

    for _ in 0..configuration.stories_to_generate {
        let story: Story = (0..rng.gen_range(1..configuration.maximum_number_of_tables))
            .map(|_| {
                if rng.gen_bool(0.1) {
                    Flowable::PageBreak
                } else {
                    random_table(&mut rng, &configuration).into()
                }
            })
            .collect();

        let mut pdf_document = DocTemplate::letter_form()
            .build(&story, &RenderConfiguration::default())
            .unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();
        let document = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(document.get_pages().len(), pdf_document.page_count());
    }
}

fn random_table(rng: &mut rand::rngs::ThreadRng, configuration: &FuzzStoriesConfiguration) -> Table {
    let columns = rng.gen_range(configuration.columns_range.clone());
    let rows = rng.gen_range(configuration.rows_range.clone());
    let cells: Vec<Vec<Cell>> = (0..rows)
        .map(|_| {
            (0..columns)
                .map(|_| Cell::Text(random_utf8_characters(rng, configuration)))
                .collect()
        })
        .collect();
    let column_widths: Vec<f32> = (0..columns)
        .map(|_| rng.gen_range(configuration.column_width_range.clone()))
        .collect();

    Table::new(cells)
        .with_column_widths(column_widths)
        .with_style(TableStyle::new([
            StyleCommand::inner_grid((0, 0), (-1, -1), 0.25),
            StyleCommand::font_size((0, 0), (-1, -1), rng.gen_range(6.0..12.0)),
        ]))
}

fn random_utf8_characters(
    rng: &mut rand::rngs::ThreadRng,
    configuration: &FuzzStoriesConfiguration,
) -> String {
    let length = rng.gen_range(1..=configuration.maximum_string_length);
    rand_utf8::rand_utf8(rng, length).to_string()
}
