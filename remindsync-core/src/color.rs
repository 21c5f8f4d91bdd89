//! Calendar color resolution.

use crate::model::{ColorSpace, NativeColor, Rgb};

/// Map a provider-native color to RGB by copying the device channels.
///
/// Returns `None` when there is no color, when the provider has not loaded it
/// yet, or when fewer than three channels are present.
pub fn resolve(color: Option<&NativeColor>) -> Option<Rgb> {
    let color = color?;

    match color.space {
        ColorSpace::DeviceRgb => match color.components.as_slice() {
            [red, green, blue, ..] => Some(Rgb {
                red: *red,
                green: *green,
                blue: *blue,
            }),
            _ => None,
        },
        ColorSpace::Unavailable => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_in_none_out() {
        assert_eq!(resolve(None), None);
    }

    #[test]
    fn test_channels_copied_without_clamping() {
        let color = NativeColor {
            space: ColorSpace::DeviceRgb,
            components: vec![0.25, 1.2, -0.1, 1.0],
        };
        assert_eq!(
            resolve(Some(&color)),
            Some(Rgb {
                red: 0.25,
                green: 1.2,
                blue: -0.1
            })
        );
    }

    #[test]
    fn test_unavailable_and_short_colors() {
        assert_eq!(resolve(Some(&NativeColor::unavailable())), None);

        let short = NativeColor {
            space: ColorSpace::DeviceRgb,
            components: vec![0.1, 0.2],
        };
        assert_eq!(resolve(Some(&short)), None);
    }
}
