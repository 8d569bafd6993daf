/// Number of PDF points in a millimeter.
pub const MILLIMETER: f32 = 72.0 / 25.4;

/// US Letter page size in points (width, height).
pub const LETTER: [f32; 2] = [612.0, 792.0];

/// Converts millimeters to points. Layout happens in points because this is what the PDF
/// specification expects, while form measurements are easier to reason about in millimeters.
pub fn mm(millimeters: f32) -> f32 {
    millimeters * MILLIMETER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_an_inch_worth_of_millimeters() {
        assert!((mm(25.4) - 72.0).abs() < 1e-4);
    }
}
