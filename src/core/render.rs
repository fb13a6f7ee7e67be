//! Leaflet bubble map rendering.
//!
//! Produces a standalone HTML document: one circle marker per geocoded
//! postal code, block labels on the red ones, and a fixed legend box.

use crate::domain::model::{LatLon, PostalAggregate, RunParameters, SummaryStatistics};
use std::collections::BTreeMap;
use std::fmt::Write;

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";
const FONT_AWESOME_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.2.0/css/all.min.css";

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
pub const DEFAULT_ZOOM: u8 = 16;

/// Offset applied to block labels so they sit above-left of the bubble.
const LABEL_OFFSET: f64 = 0.0001;
const FILL_OPACITY: f64 = 0.3;

/// Map center per prefix code, with a fallback for unknown prefixes.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterTable {
    centers: BTreeMap<String, LatLon>,
    default_center: LatLon,
}

impl CenterTable {
    pub fn new(centers: BTreeMap<String, LatLon>, default_center: LatLon) -> Self {
        Self {
            centers,
            default_center,
        }
    }

    pub fn builtin_centers() -> BTreeMap<String, LatLon> {
        BTreeMap::from([
            ("NSL".to_string(), LatLon::new(1.4248671, 103.8490735)),
            ("CP".to_string(), LatLon::new(1.4336331, 103.8352494)),
            ("NSS".to_string(), LatLon::new(1.4172761, 103.8375479)),
            ("NSC".to_string(), LatLon::new(1.423678, 103.8340208)),
            ("NSE".to_string(), LatLon::new(1.4300711, 103.8423965)),
        ])
    }

    pub const BUILTIN_DEFAULT: LatLon = LatLon::new(1.4259, 103.8482);

    pub fn center_for(&self, prefix: &str) -> LatLon {
        self.centers
            .get(prefix)
            .copied()
            .unwrap_or(self.default_center)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.centers.keys().map(String::as_str)
    }
}

impl Default for CenterTable {
    fn default() -> Self {
        Self::new(Self::builtin_centers(), Self::BUILTIN_DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Red,
    Blue,
}

impl MarkerColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Blue => "blue",
        }
    }
}

/// Red once a postal code is more than one case above the threshold.
pub fn marker_color(count: u64, min_count: i64) -> MarkerColor {
    if i128::from(count) > i128::from(min_count) + 1 {
        MarkerColor::Red
    } else {
        MarkerColor::Blue
    }
}

/// Radius multiplier: shrinks linearly as the threshold rises, flat from 6 up.
pub fn radius_factor(min_count: i64) -> f64 {
    if min_count < 6 {
        3.0 - 0.7 * (min_count as f64 - 3.0)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: LatLon,
    pub radius: f64,
    pub color: MarkerColor,
    pub postal_code: String,
    pub count: u64,
    pub block: String,
    /// Position of the block label; only red markers carry one.
    pub label: Option<LatLon>,
}

/// Markers for every row with resolved coordinates, in row order.
pub fn build_markers(rows: &[PostalAggregate], min_count: i64) -> Vec<Marker> {
    let factor = radius_factor(min_count);

    rows.iter()
        .filter_map(|row| {
            let position = row.coordinates()?;
            let color = marker_color(row.count, min_count);
            let label = (color == MarkerColor::Red)
                .then(|| LatLon::new(position.lat + LABEL_OFFSET, position.lon - LABEL_OFFSET));

            Some(Marker {
                position,
                radius: row.count as f64 * factor,
                color,
                postal_code: row.postal_code.clone(),
                count: row.count,
                block: row.block.clone(),
                label,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MapRenderer {
    centers: CenterTable,
    zoom_start: u8,
    tile_url: String,
    attribution: String,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new(
            CenterTable::default(),
            DEFAULT_ZOOM,
            DEFAULT_TILE_URL.to_string(),
            DEFAULT_ATTRIBUTION.to_string(),
        )
    }
}

impl MapRenderer {
    pub fn new(centers: CenterTable, zoom_start: u8, tile_url: String, attribution: String) -> Self {
        Self {
            centers,
            zoom_start,
            tile_url,
            attribution,
        }
    }

    pub fn centers(&self) -> &CenterTable {
        &self.centers
    }

    pub fn render(
        &self,
        params: &RunParameters,
        rows: &[PostalAggregate],
        statistics: Option<&SummaryStatistics>,
    ) -> String {
        let center = self.centers.center_for(&params.prefix);
        let markers = build_markers(rows, params.min_count);
        let title = html_escape(&format!("{} {} {}", params.prefix, params.month, params.year));

        let mut output = String::with_capacity(4096 + markers.len() * 512);
        let _ = writeln!(output, "<!DOCTYPE html>");
        let _ = writeln!(output, "<html>");
        let _ = writeln!(output, "<head>");
        let _ = writeln!(output, "<meta charset=\"utf-8\" />");
        let _ = writeln!(
            output,
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />"
        );
        let _ = writeln!(output, "<title>{title}</title>");
        let _ = writeln!(output, "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\" />");
        let _ = writeln!(output, "<link rel=\"stylesheet\" href=\"{FONT_AWESOME_CSS}\" />");
        let _ = writeln!(output, "<script src=\"{LEAFLET_JS}\"></script>");
        let _ = writeln!(
            output,
            "<style>html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }} \
             #map {{ position: absolute; top: 0; bottom: 0; left: 0; right: 0; }}</style>"
        );
        let _ = writeln!(output, "</head>");
        let _ = writeln!(output, "<body>");
        let _ = writeln!(output, "<div id=\"map\"></div>");
        write_legend(&mut output, params, statistics);
        let _ = writeln!(output, "<script>");
        let _ = writeln!(
            output,
            "var map = L.map(\"map\", {{ center: [{}, {}], zoom: {} }});",
            center.lat, center.lon, self.zoom_start
        );
        let _ = writeln!(
            output,
            "L.tileLayer({}, {{ maxZoom: 19, attribution: {} }}).addTo(map);",
            js_string(&self.tile_url),
            js_string(&self.attribution)
        );
        for marker in &markers {
            write_marker(&mut output, marker);
        }
        let _ = writeln!(output, "</script>");
        let _ = writeln!(output, "</body>");
        let _ = writeln!(output, "</html>");
        output
    }
}

fn write_marker(output: &mut String, marker: &Marker) {
    let color = marker.color.as_str();
    let tooltip = format!(
        "Postal Code:<b> {}</b><br> Cases:<b> {}</b><br> Block:<b> {}</b>",
        html_escape(&marker.postal_code),
        marker.count,
        html_escape(&marker.block)
    );

    let _ = writeln!(
        output,
        "L.circleMarker([{}, {}], {{ radius: {}, color: \"{color}\", fill: true, fillColor: \"{color}\", fillOpacity: {FILL_OPACITY} }}).bindTooltip({}).addTo(map);",
        marker.position.lat,
        marker.position.lon,
        marker.radius,
        js_string(&tooltip)
    );

    if let Some(label) = marker.label {
        let html = format!(
            "<div style='font-size: 10pt;'><b>{}</b></div>",
            html_escape(&marker.block)
        );
        let _ = writeln!(
            output,
            "L.marker([{}, {}], {{ icon: L.divIcon({{ className: \"\", html: {} }}) }}).addTo(map);",
            label.lat,
            label.lon,
            js_string(&html)
        );
    }
}

fn write_legend(output: &mut String, params: &RunParameters, statistics: Option<&SummaryStatistics>) {
    let red_from = i128::from(params.min_count) + 1;
    let (mean, median, mode) = match statistics {
        Some(stats) => (
            format!("{:.2}", stats.mean),
            stats.median_label(),
            stats.mode.to_string(),
        ),
        None => ("n/a".to_string(), "n/a".to_string(), "n/a".to_string()),
    };

    let _ = writeln!(
        output,
        "<div style=\"position: fixed; bottom: 50px; left: 50px; width: 130px; height: 180px; \
         background-color: white; z-index: 9999; font-size: 12px; \
         border: 2px solid grey; border-radius: 6px;\">"
    );
    let _ = writeln!(
        output,
        "&nbsp; <b>{} {} {}</b> <br>",
        html_escape(&params.prefix),
        html_escape(&params.month),
        html_escape(&params.year)
    );
    let _ = writeln!(output, "&nbsp; <br>");
    let _ = writeln!(output, "&nbsp; <b>Legend</b> <br>");
    let _ = writeln!(
        output,
        "&nbsp; <i class=\"fa fa-circle\" style=\"color:red\"></i>&nbsp; &gt; {red_from} cases <br>"
    );
    let _ = writeln!(
        output,
        "&nbsp; <i class=\"fa fa-circle\" style=\"color:blue\"></i>&nbsp; {} or {red_from} cases <br>",
        params.min_count
    );
    let _ = writeln!(output, "<br>");
    let _ = writeln!(output, "&nbsp; <b>Statistics</b> <br>");
    let _ = writeln!(output, "&nbsp; Mean Count: {mean} <br>");
    let _ = writeln!(output, "&nbsp; Median Count: {median} <br>");
    let _ = writeln!(output, "&nbsp; Mode Count: {mode} <br>");
    let _ = writeln!(output, "</div>");
}

pub fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// JSON string literal that is also safe inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_count: i64) -> RunParameters {
        RunParameters {
            input: "cases.csv".to_string(),
            output_csv: "out.csv".to_string(),
            output_html: "out.html".to_string(),
            prefix: "NSL".to_string(),
            month: "Jan".to_string(),
            year: "2024".to_string(),
            min_count,
        }
    }

    fn located(code: &str, count: u64, block: &str, lat: f64, lon: f64) -> PostalAggregate {
        let mut row = PostalAggregate::new(code, count, block);
        row.set_coordinates(Some(LatLon::new(lat, lon)));
        row
    }

    #[test]
    fn test_center_lookup_with_default() {
        let table = CenterTable::default();
        assert_eq!(table.center_for("NSL"), LatLon::new(1.4248671, 103.8490735));
        assert_eq!(table.center_for("CP"), LatLon::new(1.4336331, 103.8352494));
        assert_eq!(table.center_for("XYZ"), CenterTable::BUILTIN_DEFAULT);
        assert_eq!(table.prefixes().collect::<Vec<_>>(), vec!["CP", "NSC", "NSE", "NSL", "NSS"]);
    }

    #[test]
    fn test_radius_factor() {
        assert_eq!(radius_factor(3), 3.0);
        assert!((radius_factor(4) - 2.3).abs() < 1e-9);
        assert!((radius_factor(5) - 1.6).abs() < 1e-9);
        assert_eq!(radius_factor(6), 1.0);
        assert_eq!(radius_factor(42), 1.0);
        assert!((radius_factor(-2) - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_radius_factor_at_integer_extremes() {
        let smallest = radius_factor(i64::MIN);
        assert!(smallest.is_finite());
        assert!(smallest > radius_factor(0));
        assert_eq!(radius_factor(i64::MAX), 1.0);
    }

    #[test]
    fn test_marker_color_threshold() {
        assert_eq!(marker_color(4, 2), MarkerColor::Red);
        assert_eq!(marker_color(3, 2), MarkerColor::Blue);
        assert_eq!(marker_color(2, 2), MarkerColor::Blue);
    }

    #[test]
    fn test_markers_skip_unresolved_rows() {
        let rows = vec![
            located("456001", 5, "BLK1", 1.43, 103.84),
            PostalAggregate::new("789002", 4, "BLK4"),
            located("111111", 3, "BLK9", 1.42, 103.83),
        ];

        let markers = build_markers(&rows, 2);
        assert_eq!(markers.len(), 2);

        let red = &markers[0];
        assert_eq!(red.color, MarkerColor::Red);
        assert!((red.radius - 5.0 * 3.7).abs() < 1e-9);
        let label = red.label.unwrap();
        assert!((label.lat - 1.4301).abs() < 1e-9);
        assert!((label.lon - 103.8399).abs() < 1e-9);

        let blue = &markers[1];
        assert_eq!(blue.color, MarkerColor::Blue);
        assert!(blue.label.is_none());
    }

    #[test]
    fn test_render_contains_markers_and_legend() {
        let rows = vec![
            located("456001", 5, "BLK1", 1.43, 103.84),
            PostalAggregate::new("789002", 4, "BLK4"),
        ];
        let stats = SummaryStatistics {
            mean: 10.0 / 3.0,
            median: 2.5,
            mode: 5,
            sample_size: 4,
        };

        let html = MapRenderer::default().render(&params(2), &rows, Some(&stats));

        assert!(html.contains("center: [1.4248671, 103.8490735], zoom: 16"));
        assert_eq!(html.matches("L.circleMarker(").count(), 1);
        assert_eq!(html.matches("L.divIcon(").count(), 1);
        assert!(html.contains("456001"));
        assert!(!html.contains("789002"));
        assert!(html.contains("<b>NSL Jan 2024</b>"));
        assert!(html.contains("&gt; 3 cases"));
        assert!(html.contains("2 or 3 cases"));
        assert!(html.contains("Mean Count: 3.33 <br>"));
        assert!(html.contains("Median Count: 2.5 <br>"));
        assert!(html.contains("Mode Count: 5 <br>"));
    }

    #[test]
    fn test_even_distribution_median_keeps_decimal() {
        let stats = SummaryStatistics {
            mean: 2.0,
            median: 2.0,
            mode: 3,
            sample_size: 2,
        };
        let html = MapRenderer::default().render(&params(2), &[], Some(&stats));
        assert!(html.contains("Median Count: 2.0 <br>"));

        let odd = SummaryStatistics {
            sample_size: 3,
            ..stats
        };
        let html = MapRenderer::default().render(&params(2), &[], Some(&odd));
        assert!(html.contains("Median Count: 2 <br>"));
    }

    #[test]
    fn test_render_without_statistics() {
        let html = MapRenderer::default().render(&params(2), &[], None);
        assert!(html.contains("Mean Count: n/a"));
        assert!(!html.contains("L.circleMarker("));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(html_escape("<b>&'\""), "&lt;b&gt;&amp;&#x27;&quot;");
        assert_eq!(js_string("</script>"), "\"<\\/script>\"");
    }
}
