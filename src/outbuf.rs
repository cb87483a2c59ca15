//! Page buffers and document assembly.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{BBox, Rgb24};

/// Output of one page: body bytes plus what the document framing needs
/// to know about them.
#[derive(Clone, Debug, Default)]
pub struct PageBuffer {
    pub number: u32,
    /// Written before the body when the page is emitted.
    pub header: Vec<u8>,
    pub body: Vec<u8>,
    pub trailer: Vec<u8>,
    /// Device-space extent of everything painted.
    pub bbox: BBox,
    pub fonts_used: BTreeSet<String>,
    pub colors_used: BTreeSet<Rgb24>,
    /// Length of the body prefix already given to the sink.
    pub streamed: usize,
}

impl PageBuffer {
    pub fn new(number: u32) -> Self {
        PageBuffer {
            number,
            ..Default::default()
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Discard the body and the bbox, as for an erased page.
    pub fn reset(&mut self) {
        self.body.clear();
        self.streamed = 0;
        self.bbox = BBox::new();
    }

    /// Bytes written since the last call, for streaming backends.
    pub fn take_unstreamed(&mut self) -> &[u8] {
        let start = self.streamed;
        self.streamed = self.body.len();
        &self.body[start..]
    }

    /// Header, body and trailer in order.
    pub fn assemble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.body.len() + self.trailer.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out.extend_from_slice(&self.trailer);
        out
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Write for PageBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.body.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// All pages of a multi-page document, kept until teardown.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub pages: Vec<PageBuffer>,
}

impl Document {
    /// Union of the page bounding boxes.
    pub fn bbox(&self) -> BBox {
        let mut b = BBox::new();
        for p in &self.pages {
            b.expand_bbox(&p.bbox);
        }
        b
    }

    pub fn fonts_used(&self) -> BTreeSet<String> {
        self.pages.iter().flat_map(|p| p.fonts_used.iter().cloned()).collect()
    }

    pub fn colors_used(&self) -> BTreeSet<Rgb24> {
        self.pages.iter().flat_map(|p| p.colors_used.iter().copied()).collect()
    }

    /// Document header, each page's header, body and trailer, then the
    /// document trailer.
    pub fn assemble(&self, header: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut out = header.to_vec();
        for p in &self.pages {
            out.extend_from_slice(&p.assemble());
        }
        out.extend_from_slice(trailer);
        out
    }
}

/// Format a real number the way `%.*g` does: `precision` significant
/// digits, trailing zeros dropped, exponent form for very large or small
/// magnitudes.
pub fn fmt_g(x: f64, precision: usize) -> String {
    if x == 0.0 || !x.is_finite() {
        return if x.is_finite() { "0".to_string() } else { x.to_string() };
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, x);
    let exp: i32 = sci
        .rsplit_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    if exp < -4 || exp >= precision as i32 {
        let (mantissa, _) = sci.split_once('e').unwrap_or((&sci, ""));
        let mantissa = trim_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;
    use std::fmt::Write as _;

    // ==================== Buffer tests ====================

    #[test]
    fn assembles_header_body_trailer() {
        let mut p = PageBuffer::new(1);
        p.header = b"<h>".to_vec();
        write!(p, "body {}", 1).unwrap();
        p.trailer = b"</h>".to_vec();
        assert_eq!(p.assemble(), b"<h>body 1</h>");
    }

    #[test]
    fn streaming_hands_out_each_byte_once() {
        let mut p = PageBuffer::new(1);
        p.write_bytes(b"ab");
        assert_eq!(p.take_unstreamed(), b"ab");
        p.write_bytes(b"c");
        assert_eq!(p.take_unstreamed(), b"c");
        assert_eq!(p.take_unstreamed(), b"");
    }

    #[test]
    fn document_bbox_is_union() {
        let mut a = PageBuffer::new(1);
        a.bbox.expand_point(dvec2(0.0, 0.0));
        let mut b = PageBuffer::new(2);
        b.bbox.expand_point(dvec2(5.0, -1.0));
        let doc = Document { pages: vec![a, b] };
        let bb = doc.bbox();
        assert_eq!(bb.min, dvec2(0.0, -1.0));
        assert_eq!(bb.max, dvec2(5.0, 0.0));
    }

    // ==================== Number formatting tests ====================

    #[test]
    fn g_format() {
        assert_eq!(fmt_g(0.0, 5), "0");
        assert_eq!(fmt_g(1.0, 5), "1");
        assert_eq!(fmt_g(0.5, 5), "0.5");
        assert_eq!(fmt_g(10.4334305246, 5), "10.433");
        assert_eq!(fmt_g(123456.0, 5), "1.2346e+05");
        assert_eq!(fmt_g(0.00001234, 5), "1.234e-05");
        assert_eq!(fmt_g(-0.25, 5), "-0.25");
        assert_eq!(fmt_g(99999.0, 5), "99999");
    }
}
