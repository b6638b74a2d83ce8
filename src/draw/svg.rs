use crate::draw::{charge_suffix, AtomLabel, LineStyle, Painter};
use crate::graph::WedgeKind;
use crate::layout::Layout;
use crate::math::Vector2;

/// Collects drawing primitives as SVG elements.
///
/// Layout coordinates grow upwards; the painter flips them onto the
/// downward SVG y axis.
pub struct SvgPainter {
    width: f64,
    height: f64,
    stroke: f64,
    font_size: f64,
    wedge_width: f64,
    body: String,
}

impl SvgPainter {
    pub fn new(width: f64, height: f64, bond_length: f64) -> Self {
        Self {
            width,
            height,
            stroke: (bond_length / 20.0).max(0.5),
            font_size: bond_length * 0.5,
            wedge_width: bond_length * 0.2,
            body: String::new(),
        }
    }

    /// A painter sized for `layout`.
    pub fn for_layout(layout: &Layout, bond_length: f64) -> Self {
        Self::new(layout.width, layout.height, bond_length * layout.scale)
    }

    fn flip(&self, p: Vector2) -> Vector2 {
        Vector2::new(p.x, self.height - p.y)
    }

    /// The finished document.
    pub fn finish(self) -> String {
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.2}\" height=\"{h:.2}\" viewBox=\"0 0 {w:.2} {h:.2}\">\n",
            w = self.width,
            h = self.height
        ));
        svg.push_str(&format!(
            "<g stroke=\"black\" stroke-width=\"{:.2}\" stroke-linecap=\"round\" fill=\"none\">\n",
            self.stroke
        ));
        svg.push_str(&self.body);
        svg.push_str("</g>\n</svg>\n");
        svg
    }
}

impl Painter for SvgPainter {
    fn draw_line(&mut self, from: Vector2, to: Vector2, style: LineStyle) {
        let (a, b) = (self.flip(from), self.flip(to));
        let dash = match style {
            LineStyle::Solid => String::new(),
            LineStyle::Dashed => format!(" stroke-dasharray=\"{:.2}\"", self.stroke * 3.0),
        };
        self.body.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"{}/>\n",
            a.x, a.y, b.x, b.y, dash
        ));
    }

    fn draw_wedge(&mut self, from: Vector2, to: Vector2, kind: WedgeKind) {
        let (a, b) = (self.flip(from), self.flip(to));
        let half = (b - a).perp().normalize_or_zero() * (self.wedge_width / 2.0);
        match kind {
            WedgeKind::Wedge => {
                let (c, d) = (b + half, b - half);
                self.body.push_str(&format!(
                    "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"black\"/>\n",
                    a.x, a.y, c.x, c.y, d.x, d.y
                ));
            }
            WedgeKind::Hash => {
                let steps = 6;
                for i in 1..=steps {
                    let t = i as f64 / steps as f64;
                    let center = a + (b - a) * t;
                    let (c, d) = (center + half * t, center - half * t);
                    self.body.push_str(&format!(
                        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"/>\n",
                        c.x, c.y, d.x, d.y
                    ));
                }
            }
        }
    }

    fn draw_ball(&mut self, at: Vector2, element: &str) {
        let p = self.flip(at);
        let fill = if element == "C" { "black" } else { "white" };
        self.body.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"><title>{}</title></circle>\n",
            p.x,
            p.y,
            self.font_size * 0.4,
            fill,
            element
        ));
    }

    fn draw_text(&mut self, at: Vector2, label: &AtomLabel) {
        let p = self.flip(at);
        let mut text = String::new();
        if let Some(isotope) = label.isotope {
            text.push_str(&format!("<tspan baseline-shift=\"super\" font-size=\"70%\">{}</tspan>", isotope));
        }
        text.push_str(&escape(&label.text));
        if label.hydrogens > 0 {
            text.push('H');
            if label.hydrogens > 1 {
                text.push_str(&format!("<tspan baseline-shift=\"sub\" font-size=\"70%\">{}</tspan>", label.hydrogens));
            }
        }
        let charge = charge_suffix(label.charge);
        if !charge.is_empty() {
            text.push_str(&format!("<tspan baseline-shift=\"super\" font-size=\"70%\">{}</tspan>", charge));
        }
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"sans-serif\" font-size=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" fill=\"black\" stroke=\"none\">{}</text>\n",
            p.x, p.y, self.font_size, text
        ));
    }

    fn draw_ring(&mut self, center: Vector2, radius: f64) {
        let p = self.flip(center);
        self.body.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"/>\n",
            p.x, p.y, radius
        ));
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::render;
    use crate::engine::LayoutEngine;

    fn svg(smiles: &str) -> String {
        let engine = LayoutEngine::default();
        let layout = engine.layout_smiles(smiles).unwrap();
        let mut painter = SvgPainter::for_layout(&layout, engine.options().bond_length);
        render(&layout, engine.options(), &mut painter);
        painter.finish()
    }

    #[test]
    fn test_document_shape() {
        let document = svg("CCO");
        assert!(document.starts_with("<svg"));
        assert!(document.trim_end().ends_with("</svg>"));
        assert_eq!(document.matches("<line").count(), 2);
        assert!(document.contains(">O</text>") || document.contains(">OH</text>"));
    }

    #[test]
    fn test_benzene_has_circle() {
        let document = svg("c1ccccc1");
        assert_eq!(document.matches("<circle").count(), 1);
        assert_eq!(document.matches("<line").count(), 6);
    }

    #[test]
    fn test_wedge_polygon_or_hash() {
        let document = svg("F[C@H](Cl)Br");
        let wedge = document.matches("<polygon").count();
        let hashes = document.matches("<line").count() - 2;
        assert!(wedge == 1 || hashes == 6);
    }

    #[test]
    fn test_y_axis_is_flipped() {
        let mut painter = SvgPainter::new(100.0, 100.0, 30.0);
        painter.draw_line(Vector2::new(0.0, 10.0), Vector2::new(0.0, 90.0), LineStyle::Solid);
        let document = painter.finish();
        assert!(document.contains("y1=\"90.00\""));
        assert!(document.contains("y2=\"10.00\""));
    }
}
