use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::percentile::RankReport;
use crate::position::{PositionGroup, describe_groups};

pub const DEFAULT_WRAP_WIDTH: usize = 12;

/// Six-step palette for the performance scheme, worst band first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gradient {
    #[default]
    WarmToCool,
    BlueScale,
    PurpleScale,
    Ocean,
    Sunset,
}

impl Gradient {
    pub const ALL: [Gradient; 5] = [
        Gradient::WarmToCool,
        Gradient::BlueScale,
        Gradient::PurpleScale,
        Gradient::Ocean,
        Gradient::Sunset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gradient::WarmToCool => "warm_to_cool",
            Gradient::BlueScale => "blue_scale",
            Gradient::PurpleScale => "purple_scale",
            Gradient::Ocean => "ocean",
            Gradient::Sunset => "sunset",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Gradient::ALL.into_iter().find(|g| g.name().eq_ignore_ascii_case(name))
    }

    pub fn colors(self) -> [&'static str; 6] {
        match self {
            Gradient::WarmToCool => ["#e8a5a5", "#f4b5a5", "#f5d5a5", "#f5f5a5", "#b5d5a5", "#95d595"],
            Gradient::BlueScale => ["#ffcccc", "#cce6ff", "#99d6ff", "#66c2ff", "#3399ff", "#0066cc"],
            Gradient::PurpleScale => ["#f0e6ff", "#e6ccff", "#d9b3ff", "#cc99ff", "#bf80ff", "#9933ff"],
            Gradient::Ocean => ["#ffe6e6", "#e6f3ff", "#cce6ff", "#99d6ff", "#66b3ff", "#0080ff"],
            Gradient::Sunset => ["#ffe6cc", "#ffcc99", "#ffb366", "#ff9933", "#ff6600", "#cc3300"],
        }
    }

    pub fn color_for(self, percentile: f64) -> &'static str {
        self.colors()[performance_band(percentile)]
    }
}

/// Band index 0..=5 for the upper bounds 10, 25, 50, 75, 90 and above.
pub fn performance_band(percentile: f64) -> usize {
    match percentile {
        p if p <= 10.0 => 0,
        p if p <= 25.0 => 1,
        p if p <= 50.0 => 2,
        p if p <= 75.0 => 3,
        p if p <= 90.0 => 4,
        _ => 5,
    }
}

pub const LEGEND_LABELS: [&str; 6] = [
    "Bottom 10%",
    "Bottom 25%",
    "Bottom 50%",
    "Top 50%",
    "Top 25%",
    "Top 10%",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorScheme {
    /// Every slice in one colour, values in white.
    Single { color: String },
    /// Slice colour follows the percentile band.
    Performance { gradient: Gradient },
    /// Consecutive runs of `run` slices share a colour, cycling through `colors`.
    Grouped { colors: Vec<String>, run: usize },
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme::Performance {
            gradient: Gradient::default(),
        }
    }
}

impl ColorScheme {
    pub fn single(color: impl Into<String>) -> Self {
        ColorScheme::Single { color: color.into() }
    }

    pub fn grouped_default() -> Self {
        ColorScheme::Grouped {
            colors: ["#5D688A", "#F7A5A5", "#FFDBB6", "#FFF2EF"]
                .into_iter()
                .map(String::from)
                .collect(),
            run: 3,
        }
    }

    fn slice_colors(&self, idx: usize, percentile: f64) -> (String, &'static str) {
        match self {
            ColorScheme::Single { color } => (color.clone(), "#FFFFFF"),
            ColorScheme::Performance { gradient } => {
                (gradient.color_for(percentile).to_string(), "#000000")
            }
            ColorScheme::Grouped { colors, run } => {
                let fill = if colors.is_empty() {
                    "#5D688A".to_string()
                } else {
                    colors[(idx / (*run).max(1)) % colors.len()].clone()
                };
                (fill, "#000000")
            }
        }
    }
}

/// Everything visual about a chart. One renderer serves every look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub grid_color: String,
    pub text_color: String,
    pub scheme: ColorScheme,
    pub wrap_width: usize,
    /// Radius of the empty centre as a share of the outer radius.
    pub inner_ratio: f64,
    /// Opacity of the unfilled remainder of each slice.
    pub blank_alpha: f64,
    pub legend: bool,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 700,
            height: 800,
            background: "#f5eddc".to_string(),
            grid_color: "#ddd0b8".to_string(),
            text_color: "#000000".to_string(),
            scheme: ColorScheme::default(),
            wrap_width: DEFAULT_WRAP_WIDTH,
            inner_ratio: 0.15,
            blank_alpha: 0.4,
            legend: true,
        }
    }
}

impl ChartStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// White background with grouped slice colours.
    pub fn classic() -> Self {
        Self::default()
            .with_background("#FFFFFF")
            .with_grid_color("#E0E0E0")
            .with_scheme(ColorScheme::grouped_default())
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(200);
        self.height = height.max(200);
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = color.into();
        self
    }

    pub fn with_grid_color(mut self, color: impl Into<String>) -> Self {
        self.grid_color = color.into();
        self
    }

    pub fn with_scheme(mut self, scheme: ColorScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_gradient(self, gradient: Gradient) -> Self {
        self.with_scheme(ColorScheme::Performance { gradient })
    }

    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width.max(1);
        self
    }

    pub fn with_inner_ratio(mut self, ratio: f64) -> Self {
        self.inner_ratio = ratio;
        self.inner_ratio = self.effective_inner_ratio();
        self
    }

    /// Inner radius as a share of the outer one, kept in [0, 0.9]. Styles
    /// loaded from config skip the builder, so rendering goes through this.
    pub fn effective_inner_ratio(&self) -> f64 {
        if self.inner_ratio.is_finite() {
            self.inner_ratio.clamp(0.0, 0.9)
        } else {
            0.15
        }
    }

    pub fn with_legend(mut self, legend: bool) -> Self {
        self.legend = legend;
        self
    }
}

/// Break a label into lines of at most `max` characters where possible.
///
/// Dots and percent signs count as break points, so "Prog. Pass Acc. %" becomes
/// "Prog. Pass" / "Acc. %". Single words longer than `max` stay whole.
pub fn wrap_label(label: &str, max: usize) -> Vec<String> {
    if label.chars().count() <= max {
        return vec![label.to_string()];
    }
    let spaced = label.replace('.', ". ").replace('%', "% ");
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in spaced.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Title block context that does not come from the ranking itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartHeader {
    pub season: String,
    /// Overrides the player's own competition in the subtitle.
    pub competition: Option<String>,
    pub sample_positions: Vec<PositionGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub lines: Vec<String>,
    pub percentile: f64,
    pub value: Option<f64>,
    pub fill: String,
    pub value_color: String,
}

/// Renderable chart: slices in axis order plus the title block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PizzaChart {
    pub title: String,
    pub subtitle: String,
    pub slices: Vec<Slice>,
    pub legend: Vec<(String, String)>,
}

impl PizzaChart {
    pub fn from_report(report: &RankReport, header: &ChartHeader, style: &ChartStyle) -> Self {
        let title = match &report.team {
            Some(team) => format!("{} | {}", report.player, team),
            None => report.player.clone(),
        };
        let competition = header
            .competition
            .clone()
            .or_else(|| report.competition.clone())
            .unwrap_or_else(|| "All Competitions".to_string());
        let league = match header.season.trim() {
            "" => competition,
            season => format!("{competition} {season}"),
        };
        let subtitle = format!(
            "{league} | Percentiles vs {}",
            describe_groups(&header.sample_positions)
        );
        let axes: Vec<(Metric, f64, Option<f64>)> = report
            .scores
            .iter()
            .map(|s| (s.metric, s.percentile, s.value))
            .collect();
        Self::build(title, subtitle, &axes, style)
    }

    /// Chart for pre-computed `(metric, percentile)` pairs.
    pub fn from_pairs(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        pairs: &[(Metric, f64)],
        style: &ChartStyle,
    ) -> Self {
        let axes: Vec<(Metric, f64, Option<f64>)> =
            pairs.iter().map(|(m, p)| (*m, *p, None)).collect();
        Self::build(title.into(), subtitle.into(), &axes, style)
    }

    fn build(
        title: String,
        subtitle: String,
        axes: &[(Metric, f64, Option<f64>)],
        style: &ChartStyle,
    ) -> Self {
        let slices = axes
            .iter()
            .enumerate()
            .map(|(idx, (metric, pct, value))| {
                let (fill, value_color) = style.scheme.slice_colors(idx, *pct);
                Slice {
                    label: metric.label().to_string(),
                    lines: wrap_label(metric.label(), style.wrap_width),
                    percentile: *pct,
                    value: *value,
                    fill,
                    value_color: value_color.to_string(),
                }
            })
            .collect();
        let legend = match (&style.scheme, style.legend) {
            (ColorScheme::Performance { gradient }, true) => gradient
                .colors()
                .iter()
                .zip(LEGEND_LABELS)
                .rev()
                .map(|(c, l)| (c.to_string(), l.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            title,
            subtitle,
            slices,
            legend,
        }
    }

    pub fn percentiles(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.percentile).collect()
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_percentile(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{p:.0}")
    } else {
        format!("{p:.1}")
    }
}

fn polar(cx: f64, cy: f64, r: f64, angle: f64) -> (f64, f64) {
    (cx + r * angle.cos(), cy + r * angle.sin())
}

fn sector_path(cx: f64, cy: f64, r_in: f64, r_out: f64, a0: f64, a1: f64) -> String {
    let large = if a1 - a0 > PI { 1 } else { 0 };
    let (ox0, oy0) = polar(cx, cy, r_out, a0);
    let (ox1, oy1) = polar(cx, cy, r_out, a1);
    let (ix1, iy1) = polar(cx, cy, r_in, a1);
    let (ix0, iy0) = polar(cx, cy, r_in, a0);
    format!(
        "M{ix0:.2},{iy0:.2} L{ox0:.2},{oy0:.2} A{r_out:.2},{r_out:.2} 0 {large},1 {ox1:.2},{oy1:.2} L{ix1:.2},{iy1:.2} A{r_in:.2},{r_in:.2} 0 {large},0 {ix0:.2},{iy0:.2} Z"
    )
}

/// Render the chart as a standalone SVG document.
///
/// Axis 0 sits at 12 o'clock and the rest follow clockwise. Slice length is the
/// percentile clamped to [0, 100]; the printed value is the percentile as given.
pub fn render_svg(chart: &PizzaChart, style: &ChartStyle) -> String {
    let w = f64::from(style.width);
    let h = f64::from(style.height);
    let cx = w / 2.0;
    let cy = h * 0.54;
    let r_out = (w.min(h) * 0.5 - 90.0).max(40.0);
    let r_in = r_out * style.effective_inner_ratio();
    let n = chart.slices.len().max(1);
    let step = 2.0 * PI / n as f64;

    let mut grid = String::new();
    for i in 1..=5 {
        let r = r_in + (r_out - r_in) * f64::from(i) / 5.0;
        let _ = write!(
            grid,
            r##"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="none" stroke="{}" stroke-width="1"/>"##,
            escape_xml(&style.grid_color)
        );
    }

    let mut slices = String::new();
    let mut values = String::new();
    let mut labels = String::new();
    for (i, slice) in chart.slices.iter().enumerate() {
        let a0 = -PI / 2.0 + i as f64 * step;
        let a1 = a0 + step;
        let mid = (a0 + a1) / 2.0;
        let pct = if slice.percentile.is_finite() {
            slice.percentile.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let r = r_in + (r_out - r_in) * pct / 100.0;
        let fill = escape_xml(&slice.fill);

        let _ = write!(
            slices,
            r##"<path d="{}" fill="{fill}" fill-opacity="{:.2}" stroke="{}" stroke-width="4"/>"##,
            sector_path(cx, cy, r_in, r_out, a0, a1),
            style.blank_alpha,
            escape_xml(&style.background)
        );
        if r > r_in {
            let _ = write!(
                slices,
                r##"<path d="{}" fill="{fill}" stroke="{}" stroke-width="4"/>"##,
                sector_path(cx, cy, r_in, r, a0, a1),
                escape_xml(&style.background)
            );
        }

        let (vx, vy) = polar(cx, cy, (r - 16.0).max(r_in + 16.0), mid);
        let _ = write!(
            values,
            r##"<rect x="{:.2}" y="{:.2}" width="34" height="18" rx="4" fill="{fill}" stroke="#000000" stroke-width="0.3"/><text x="{vx:.2}" y="{:.2}" text-anchor="middle" font-size="11" font-weight="700" fill="{}">{}</text>"##,
            vx - 17.0,
            vy - 9.0,
            vy + 4.0,
            escape_xml(&slice.value_color),
            format_percentile(slice.percentile)
        );

        let (lx, ly) = polar(cx, cy, r_out * 1.10 + 12.0, mid);
        let anchor = match mid.cos() {
            c if c.abs() < 0.2 => "middle",
            c if c > 0.0 => "start",
            _ => "end",
        };
        let line_h = 13.0;
        let top = ly - line_h * (slice.lines.len() as f64 - 1.0) / 2.0 + 4.0;
        let _ = write!(
            labels,
            r##"<text text-anchor="{anchor}" font-size="11" font-weight="700" fill="{}">"##,
            escape_xml(&style.text_color)
        );
        for (k, line) in slice.lines.iter().enumerate() {
            let _ = write!(
                labels,
                r##"<tspan x="{lx:.2}" y="{:.2}">{}</tspan>"##,
                top + k as f64 * line_h,
                escape_xml(line)
            );
        }
        labels.push_str("</text>");
    }

    let mut legend = String::new();
    if !chart.legend.is_empty() {
        let lx = w * 0.86 - 40.0;
        let ly = h - 30.0 - 18.0 * chart.legend.len() as f64;
        let _ = write!(
            legend,
            r##"<text x="{lx:.2}" y="{:.2}" font-size="10" font-weight="700" fill="{}">Percentiles</text>"##,
            ly - 8.0,
            escape_xml(&style.text_color)
        );
        for (k, (color, label)) in chart.legend.iter().enumerate() {
            let y = ly + 18.0 * k as f64;
            let _ = write!(
                legend,
                r##"<rect x="{lx:.2}" y="{y:.2}" width="10" height="10" fill="{}" stroke="#000000" stroke-width="0.5"/><text x="{:.2}" y="{:.2}" font-size="9" font-weight="700" fill="{}">{}</text>"##,
                escape_xml(color),
                lx + 16.0,
                y + 9.0,
                escape_xml(&style.text_color),
                escape_xml(label)
            );
        }
    }

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
  <rect width="100%" height="100%" fill="{bg}"/>
  <text x="{cx:.2}" y="{:.2}" text-anchor="middle" font-size="24" font-weight="700" fill="{fg}">{}</text>
  <text x="{cx:.2}" y="{:.2}" text-anchor="middle" font-size="16" fill="{fg}">{}</text>
  <g class="slices">{slices}</g>
  <g class="grid">{grid}</g>
  <circle cx="{cx:.2}" cy="{cy:.2}" r="{r_in:.2}" fill="{bg}"/>
  <g class="values">{values}</g>
  <g class="params">{labels}</g>
  <g class="legend">{legend}</g>
</svg>
"##,
        style.width,
        style.height,
        style.width,
        style.height,
        h * 0.05,
        escape_xml(&chart.title),
        h * 0.08,
        escape_xml(&chart.subtitle),
        bg = escape_xml(&style.background),
        fg = escape_xml(&style.text_color),
    )
}

/// File name stem for a player or chart title: anything outside letters and
/// digits becomes `_`, so names with `/` or `|` cannot escape the output dir.
pub fn file_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_').to_string();
    if stem.is_empty() { "radar".to_string() } else { stem }
}

pub fn write_svg(path: &Path, chart: &PizzaChart, style: &ChartStyle) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    fs::write(path, render_svg(chart, style))
        .with_context(|| format!("write svg {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> Vec<(Metric, f64)> {
        vec![
            (Metric::Goals, 95.0),
            (Metric::Xg, 80.0),
            (Metric::ProgPassAccPct, 60.5),
            (Metric::Dribbles, 40.0),
            (Metric::Interceptions, 20.0),
            (Metric::AerialDuelsWonPct, 5.0),
        ]
    }

    #[test]
    fn bands_follow_the_cut_points() {
        assert_eq!(performance_band(0.0), 0);
        assert_eq!(performance_band(10.0), 0);
        assert_eq!(performance_band(10.1), 1);
        assert_eq!(performance_band(50.0), 2);
        assert_eq!(performance_band(75.0), 3);
        assert_eq!(performance_band(90.0), 4);
        assert_eq!(performance_band(90.1), 5);
        assert_eq!(Gradient::Sunset.color_for(99.0), "#cc3300");
    }

    #[test]
    fn file_stems_are_safe() {
        assert_eq!(file_stem("J. Smith | Arsenal"), "J__Smith___Arsenal");
        assert_eq!(file_stem("../../etc/passwd"), "etc_passwd");
        assert_eq!(file_stem("A/B"), "A_B");
        assert_eq!(file_stem("///"), "radar");
    }

    #[test]
    fn inner_ratio_from_config_is_clamped() {
        let chart = PizzaChart::from_pairs("P | T", "sub", &axes(), &ChartStyle::default());
        let capped = ChartStyle::default().with_inner_ratio(0.9);
        let oversized = ChartStyle { inner_ratio: 2.0, ..ChartStyle::default() };
        assert_eq!(oversized.effective_inner_ratio(), 0.9);
        assert_eq!(render_svg(&chart, &oversized), render_svg(&chart, &capped));

        let negative = ChartStyle { inner_ratio: -1.0, ..ChartStyle::default() };
        let zero = ChartStyle::default().with_inner_ratio(0.0);
        assert_eq!(render_svg(&chart, &negative), render_svg(&chart, &zero));

        let nan = ChartStyle { inner_ratio: f64::NAN, ..ChartStyle::default() };
        assert_eq!(nan.effective_inner_ratio(), 0.15);
        assert_eq!(render_svg(&chart, &nan), render_svg(&chart, &ChartStyle::default()));
    }

    #[test]
    fn labels_wrap_on_words_dots_and_percent() {
        assert_eq!(wrap_label("Goals", 12), vec!["Goals"]);
        assert_eq!(wrap_label("Prog. Pass Acc. %", 12), vec!["Prog. Pass", "Acc. %"]);
        assert_eq!(
            wrap_label("Succ. Attacking Actions", 12),
            vec!["Succ.", "Attacking", "Actions"]
        );
    }

    #[test]
    fn chart_keeps_percentiles_and_order() {
        let style = ChartStyle::default();
        let chart = PizzaChart::from_pairs("P | T", "sub", &axes(), &style);
        let expected: Vec<f64> = axes().iter().map(|(_, p)| *p).collect();
        assert_eq!(chart.percentiles(), expected);
        assert_eq!(chart.slices[0].fill, "#95d595");
        assert_eq!(chart.slices[5].fill, "#e8a5a5");
        assert_eq!(chart.legend[0], ("#95d595".to_string(), "Top 10%".to_string()));
        assert_eq!(chart.legend[5].1, "Bottom 10%");
    }

    #[test]
    fn grouped_scheme_colours_runs_of_slices() {
        let style = ChartStyle::classic();
        let chart = PizzaChart::from_pairs("t", "s", &axes(), &style);
        let fills: Vec<&str> = chart.slices.iter().map(|s| s.fill.as_str()).collect();
        assert_eq!(fills, ["#5D688A", "#5D688A", "#5D688A", "#F7A5A5", "#F7A5A5", "#F7A5A5"]);
        assert!(chart.legend.is_empty());

        let single = ChartStyle::new().with_scheme(ColorScheme::single("#123456"));
        let chart = PizzaChart::from_pairs("t", "s", &axes(), &single);
        assert!(chart.slices.iter().all(|s| s.fill == "#123456" && s.value_color == "#FFFFFF"));
    }

    #[test]
    fn svg_contains_title_and_escaped_text() {
        let style = ChartStyle::default();
        let chart = PizzaChart::from_pairs("Ødegaard | Arsenal & Co", "EPL | Percentiles vs CMs", &axes(), &style);
        let svg = render_svg(&chart, &style);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Ødegaard | Arsenal &amp; Co"));
        assert!(svg.contains(">60.5<"));
        assert!(svg.contains(">95<"));
        assert_eq!(svg.matches("<tspan").count(), 8);
    }

    #[test]
    fn first_axis_starts_at_twelve_o_clock() {
        let path = sector_path(100.0, 100.0, 10.0, 50.0, -PI / 2.0, 0.0);
        assert!(path.starts_with("M100.00,90.00 L100.00,50.00"));
    }
}
