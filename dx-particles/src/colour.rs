//! This module handles the small amount of colour maths the particles need.

/// An RGB colour with channels in `[0, 1]`.
pub type RGBColour = [f32; 3];

/// Convert a `0xRRGGBB` integer into an [`RGBColour`].
pub fn hex(rgb: u32) -> RGBColour {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.,
        ((rgb >> 8) & 0xff) as f32 / 255.,
        (rgb & 0xff) as f32 / 255.,
    ]
}

/// Linearly interpolate between two colours.
pub fn lerp_colour(a: RGBColour, b: RGBColour, t: f32) -> RGBColour {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// The standard Hermite smoothstep of `x` between the two edges.
pub fn smoothstep(x: f32, edge0: f32, edge1: f32) -> f32 {
    if x <= edge0 {
        return 0.;
    }
    if x >= edge1 {
        return 1.;
    }
    let t = (x - edge0) / (edge1 - edge0);
    t * t * (3. - 2. * t)
}

/// Hue, saturation, lightness, all in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub(crate) fn from_rgb([r, g, b]: RGBColour) -> Self {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.;

        if max == min {
            return Self { h: 0., s: 0., l };
        }

        let delta = max - min;
        let s = if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2. - max - min)
        };

        let h = if max == r {
            (g - b) / delta + if g < b { 6. } else { 0. }
        } else if max == g {
            (b - r) / delta + 2.
        } else {
            (r - g) / delta + 4.
        };

        Self { h: h / 6., s, l }
    }

    pub(crate) fn to_rgb(self) -> RGBColour {
        let h = self.h.rem_euclid(1.);
        let s = self.s.clamp(0., 1.);
        let l = self.l.clamp(0., 1.);

        if s == 0. {
            return [l, l, l];
        }

        let upper = if l <= 0.5 { l * (1. + s) } else { l + s - l * s };
        let lower = 2. * l - upper;

        [
            hue_to_channel(lower, upper, h + 1. / 3.),
            hue_to_channel(lower, upper, h),
            hue_to_channel(lower, upper, h - 1. / 3.),
        ]
    }
}

fn hue_to_channel(lower: f32, upper: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.);
    if t < 1. / 6. {
        lower + (upper - lower) * 6. * t
    } else if t < 0.5 {
        upper
    } else if t < 2. / 3. {
        lower + (upper - lower) * 6. * (2. / 3. - t)
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn assert_colour_eq(a: RGBColour, b: RGBColour) {
        for (x, y) in a.into_iter().zip(b) {
            assert!(approx_eq!(f32, x, y, epsilon = 1e-5), "{a:?} != {b:?}");
        }
    }

    #[test]
    fn hex_parses_channels() {
        assert_colour_eq(hex(0xff0000), [1., 0., 0.]);
        assert_colour_eq(hex(0x00ff00), [0., 1., 0.]);
        assert_colour_eq(hex(0x336699), [0.2, 0.4, 0.6]);
    }

    #[test]
    fn hsl_round_trips() {
        for colour in [hex(0x6b1bff), hex(0xff4fd8), hex(0xe9ffff), hex(0x123456), [0.5; 3]] {
            assert_colour_eq(Hsl::from_rgb(colour).to_rgb(), colour);
        }
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.2, 0.55, 1.), 0.);
        assert_eq!(smoothstep(1.2, 0.55, 1.), 1.);
        assert!(approx_eq!(f32, smoothstep(0.775, 0.55, 1.), 0.5, epsilon = 1e-6));
    }
}
