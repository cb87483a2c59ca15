//! Color names, gray emulation and fill desaturation.

use std::collections::HashMap;

use crate::types::{Rgb24, Rgb48};

/// Resolves color names to RGB48.
pub trait ColorNames: Send + Sync {
    /// Look up an already squeezed (space-free) name, case-insensitively.
    fn lookup(&self, name: &str) -> Option<Rgb48>;
}

/// The builtin table of X11-style color names.
///
/// `grayN`/`greyN` for N in 0..=100 are recognized without being listed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinColors;

const NAMED: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0xbebebe),
    ("green", 0x00ff00),
    ("greenyellow", 0xadff2f),
    ("grey", 0xbebebe),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0xb03060),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("navyblue", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0xa020f0),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("violetred", 0xd02090),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

impl ColorNames for BuiltinColors {
    fn lookup(&self, name: &str) -> Option<Rgb48> {
        let lower = name.to_ascii_lowercase();
        if let Some(level) = lower
            .strip_prefix("gray")
            .or_else(|| lower.strip_prefix("grey"))
            .filter(|n| !n.is_empty())
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|&n| n <= 100)
        {
            let v = ((level * 255 + 50) / 100) as u8;
            return Some(Rgb24::new(v, v, v).to_rgb48());
        }
        NAMED
            .binary_search_by(|(n, _)| n.cmp(&lower.as_str()))
            .ok()
            .map(|i| Rgb24::from_u32(NAMED[i].1).to_rgb48())
    }
}

/// `#rrggbb`, widened to 48 bits.
fn parse_hex(s: &str) -> Option<Rgb48> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16)
        .ok()
        .map(|rgb| Rgb24::from_u32(rgb).to_rgb48())
}

/// Name lookup with a per-plotter cache of names already resolved.
#[derive(Debug, Default, Clone)]
pub struct ColorNameCache {
    cached: HashMap<String, Rgb48>,
}

impl ColorNameCache {
    /// Resolve `#rrggbb` or a color name; spaces in names are ignored.
    pub fn resolve(&mut self, name: &str, table: &dyn ColorNames) -> Option<Rgb48> {
        if let Some(c) = parse_hex(name) {
            return Some(c);
        }
        let squeezed: String = name.chars().filter(|&c| c != ' ').collect::<String>().to_ascii_lowercase();
        if let Some(&c) = self.cached.get(&squeezed) {
            return Some(c);
        }
        let c = table.lookup(&squeezed)?;
        self.cached.insert(squeezed, c);
        Some(c)
    }
}

/// Map a color to its luminance-weighted gray.
pub fn emulate_gray(c: Rgb48) -> Rgb48 {
    let gray = 0.212671 * c.red as f64 + 0.715160 * c.green as f64 + 0.072169 * c.blue as f64;
    let g = gray.round().clamp(0.0, 65535.0) as u16;
    Rgb48::new(g, g, g)
}

/// The fill color for `fill_type`: 1 is the base color itself, 0xffff is
/// white, with linear desaturation in between.
pub fn desaturate(c: Rgb48, fill_type: i32) -> Rgb48 {
    if fill_type <= 1 {
        return c;
    }
    let d = (fill_type - 1) as f64 / 0xfffe as f64;
    let mix = |v: u16| {
        let f = v as f64 / 0xffff as f64;
        ((f + d * (1.0 - f)) * 0xffff as f64).round().clamp(0.0, 65535.0) as u16
    };
    Rgb48::new(mix(c.red), mix(c.green), mix(c.blue))
}

/// Index of the palette entry nearest to `target` in RGB space. Ties go
/// to the earliest entry.
pub fn nearest_index<'a>(target: Rgb24, palette: impl IntoIterator<Item = &'a Rgb24>) -> Option<usize> {
    palette
        .into_iter()
        .enumerate()
        .min_by_key(|(i, c)| (c.distance_sq(target), *i))
        .map(|(i, _)| i)
}
