//! Typed filter graph representation
//!
//! Stages are kept as typed values and only turned into ffmpeg filtergraph
//! syntax by [`FilterGraph::to_filter_complex`]. Every option value goes
//! through the two escaping levels ffmpeg applies (filter options, then the
//! graph itself).

use std::collections::HashMap;
use std::fmt;

use crate::error::{MontageError, MontageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Input pad of a stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamRef {
    /// Stream of an `-i` input
    Input { index: usize, kind: StreamKind },
    /// Output of an earlier stage
    Label(String),
}

impl StreamRef {
    pub fn video(index: usize) -> Self {
        StreamRef::Input {
            index,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        StreamRef::Input {
            index,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        StreamRef::Label(name.into())
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Input { index, kind } => {
                let k = match kind {
                    StreamKind::Video => 'v',
                    StreamKind::Audio => 'a',
                };
                write!(f, "[{}:{}]", index, k)
            }
            StreamRef::Label(name) => write!(f, "[{}]", name),
        }
    }
}

/// Options of a drawtext filter
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    pub text: String,
    pub font_file: Option<String>,
    /// Size in pixels or an expression
    pub font_size: String,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    pub box_color: Option<String>,
    pub x: String,
    pub y: String,
    pub alpha: Option<String>,
    pub enable: Option<String>,
}

/// One filter with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Trim { duration: f64 },
    SetPts(String),
    ATrim { duration: f64 },
    ASetPts(String),
    Crop { width: u32, height: u32, x: u32, y: u32 },
    Scale { width: u32, height: u32 },
    Pad { width: u32, height: u32, x: u32, y: u32, color: String },
    SetSar,
    Fps(u32),
    Format(String),
    ZoomPan { zoom: String, x: String, y: String, width: u32, height: u32, fps: u32 },
    Concat { count: usize, video: bool },
    DrawText(DrawText),
    Overlay { x: u32, y: u32 },
    Volume(f64),
    APad { whole_duration: f64 },
    AFormat,
    ANullSrc,
}

impl Filter {
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Trim { .. } => "trim",
            Filter::SetPts(_) => "setpts",
            Filter::ATrim { .. } => "atrim",
            Filter::ASetPts(_) => "asetpts",
            Filter::Crop { .. } => "crop",
            Filter::Scale { .. } => "scale",
            Filter::Pad { .. } => "pad",
            Filter::SetSar => "setsar",
            Filter::Fps(_) => "fps",
            Filter::Format(_) => "format",
            Filter::ZoomPan { .. } => "zoompan",
            Filter::Concat { .. } => "concat",
            Filter::DrawText(_) => "drawtext",
            Filter::Overlay { .. } => "overlay",
            Filter::Volume(_) => "volume",
            Filter::APad { .. } => "apad",
            Filter::AFormat => "aformat",
            Filter::ANullSrc => "anullsrc",
        }
    }

    /// Key/value options, unescaped
    pub fn options(&self) -> Vec<(&'static str, String)> {
        match self {
            Filter::Trim { duration } | Filter::ATrim { duration } => {
                vec![("duration", seconds(*duration))]
            }
            Filter::SetPts(expr) | Filter::ASetPts(expr) => vec![("expr", expr.clone())],
            Filter::Crop { width, height, x, y } => vec![
                ("w", width.to_string()),
                ("h", height.to_string()),
                ("x", x.to_string()),
                ("y", y.to_string()),
            ],
            Filter::Scale { width, height } => vec![("w", width.to_string()), ("h", height.to_string())],
            Filter::Pad { width, height, x, y, color } => vec![
                ("w", width.to_string()),
                ("h", height.to_string()),
                ("x", x.to_string()),
                ("y", y.to_string()),
                ("color", color.clone()),
            ],
            Filter::SetSar => vec![("sar", "1".to_string())],
            Filter::Fps(fps) => vec![("fps", fps.to_string())],
            Filter::Format(fmt) => vec![("pix_fmts", fmt.clone())],
            Filter::ZoomPan { zoom, x, y, width, height, fps } => vec![
                ("z", zoom.clone()),
                ("x", x.clone()),
                ("y", y.clone()),
                ("d", "1".to_string()),
                ("s", format!("{}x{}", width, height)),
                ("fps", fps.to_string()),
            ],
            Filter::Concat { count, video } => vec![
                ("n", count.to_string()),
                ("v", if *video { "1" } else { "0" }.to_string()),
                ("a", if *video { "0" } else { "1" }.to_string()),
            ],
            Filter::DrawText(dt) => {
                let mut opts = vec![("text", escape_drawtext(&dt.text))];
                if let Some(font) = &dt.font_file {
                    opts.push(("fontfile", font.clone()));
                }
                opts.push(("fontsize", dt.font_size.clone()));
                opts.push(("fontcolor", dt.font_color.clone()));
                if dt.border_width > 0 {
                    opts.push(("borderw", dt.border_width.to_string()));
                    opts.push(("bordercolor", dt.border_color.clone()));
                }
                if let Some(color) = &dt.box_color {
                    opts.push(("box", "1".to_string()));
                    opts.push(("boxcolor", color.clone()));
                    opts.push(("boxborderw", "20".to_string()));
                }
                opts.push(("x", dt.x.clone()));
                opts.push(("y", dt.y.clone()));
                if let Some(alpha) = &dt.alpha {
                    opts.push(("alpha", alpha.clone()));
                }
                if let Some(enable) = &dt.enable {
                    opts.push(("enable", enable.clone()));
                }
                opts
            }
            Filter::Overlay { x, y } => vec![
                ("x", x.to_string()),
                ("y", y.to_string()),
                ("eof_action", "repeat".to_string()),
            ],
            Filter::Volume(volume) => vec![("volume", format!("{:.3}", volume))],
            Filter::APad { whole_duration } => vec![("whole_dur", seconds(*whole_duration))],
            Filter::AFormat => vec![
                ("sample_fmts", "fltp".to_string()),
                ("sample_rates", "44100".to_string()),
                ("channel_layouts", "stereo".to_string()),
            ],
            Filter::ANullSrc => vec![
                ("channel_layout", "stereo".to_string()),
                ("sample_rate", "44100".to_string()),
            ],
        }
    }

    fn is_audio(&self) -> bool {
        matches!(
            self,
            Filter::ATrim { .. }
                | Filter::ASetPts(_)
                | Filter::Volume(_)
                | Filter::APad { .. }
                | Filter::AFormat
                | Filter::ANullSrc
        ) || matches!(self, Filter::Concat { video: false, .. })
    }

    /// Serialized form, escaped for use inside a filtergraph
    pub fn render(&self) -> String {
        let options: Vec<String> = self
            .options()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, escape_graph(&escape_option(&value))))
            .collect();
        if options.is_empty() {
            self.name().to_string()
        } else {
            format!("{}={}", self.name(), options.join(":"))
        }
    }
}

fn seconds(value: f64) -> String {
    format!("{:.3}", value)
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// drawtext's own expansion level
fn escape_drawtext(text: &str) -> String {
    escape_with(text, &['\\', '%'])
}

/// Filter option level
pub fn escape_option(value: &str) -> String {
    escape_with(value, &['\\', '\'', ':'])
}

/// Filtergraph level
pub fn escape_graph(value: &str) -> String {
    escape_with(value, &['\\', '\'', '[', ']', ',', ';'])
}

/// A chain of filters with its inputs and one output label
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub name: String,
    pub inputs: Vec<StreamRef>,
    pub filters: Vec<Filter>,
    pub output: String,
}

impl FilterStage {
    pub fn new(name: impl Into<String>, inputs: Vec<StreamRef>, filters: Vec<Filter>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs,
            filters,
            output: output.into(),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.filters.first().map(Filter::is_audio).unwrap_or(false)
    }

    fn render(&self) -> String {
        let inputs: String = self.inputs.iter().map(|i| i.to_string()).collect();
        let chain: Vec<String> = self.filters.iter().map(Filter::render).collect();
        format!("{}{}[{}]", inputs, chain.join(","), self.output)
    }
}

/// Ordered stages with one terminal video label and an optional audio label
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub stages: Vec<FilterStage>,
    pub input_count: usize,
    pub video_out: String,
    pub audio_out: Option<String>,
}

impl FilterGraph {
    /// Check every structural invariant the encoder relies on
    pub fn validate(&self) -> MontageResult<()> {
        let mut defined: HashMap<&str, usize> = HashMap::new();
        let mut consumed: HashMap<&str, usize> = HashMap::new();
        let mut inputs_used: HashMap<(usize, StreamKind), usize> = HashMap::new();

        for (position, stage) in self.stages.iter().enumerate() {
            if stage.filters.is_empty() {
                return Err(MontageError::build(format!("Stage '{}' has no filters", stage.name)));
            }
            for input in &stage.inputs {
                match input {
                    StreamRef::Input { index, kind } => {
                        if *index >= self.input_count {
                            return Err(MontageError::build(format!(
                                "Stage '{}' references input {} but only {} inputs exist",
                                stage.name, index, self.input_count
                            )));
                        }
                        let uses = inputs_used.entry((*index, *kind)).or_insert(0);
                        *uses += 1;
                        if *uses > 1 {
                            return Err(MontageError::build(format!(
                                "Input stream {} is consumed more than once",
                                input
                            )));
                        }
                    }
                    StreamRef::Label(label) => {
                        if !defined.contains_key(label.as_str()) {
                            return Err(MontageError::build(format!(
                                "Stage '{}' references undefined label [{}]",
                                stage.name, label
                            )));
                        }
                        let uses = consumed.entry(label.as_str()).or_insert(0);
                        *uses += 1;
                        if *uses > 1 {
                            return Err(MontageError::build(format!("Label [{}] is consumed more than once", label)));
                        }
                    }
                }
            }
            if stage.output.is_empty() || !stage.output.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(MontageError::build(format!(
                    "Stage '{}' has an invalid output label '{}'",
                    stage.name, stage.output
                )));
            }
            if defined.insert(stage.output.as_str(), position).is_some() {
                return Err(MontageError::build(format!("Label [{}] is defined twice", stage.output)));
            }
        }

        let mut terminals: Vec<&str> = defined
            .keys()
            .filter(|label| !consumed.contains_key(*label))
            .copied()
            .collect();
        terminals.sort_unstable();

        let mut expected = vec![self.video_out.as_str()];
        if let Some(audio) = &self.audio_out {
            expected.push(audio.as_str());
        }
        expected.sort_unstable();

        if terminals != expected {
            return Err(MontageError::build(format!(
                "Graph terminals {:?} do not match expected outputs {:?}",
                terminals, expected
            )));
        }
        Ok(())
    }

    /// Serialize to `-filter_complex` syntax
    pub fn to_filter_complex(&self) -> String {
        self.stages.iter().map(FilterStage::render).collect::<Vec<_>>().join(";\n")
    }

    /// Human-readable listing of every stage
    pub fn debug_dump(&self) -> String {
        let mut out = format!(
            "filter graph: {} stages, {} inputs, video -> [{}]",
            self.stages.len(),
            self.input_count,
            self.video_out
        );
        if let Some(audio) = &self.audio_out {
            out.push_str(&format!(", audio -> [{}]", audio));
        }
        out.push('\n');
        for (i, stage) in self.stages.iter().enumerate() {
            let inputs: Vec<String> = stage.inputs.iter().map(|r| r.to_string()).collect();
            out.push_str(&format!(
                "{:>3}. {:<16} {} -> [{}]\n",
                i + 1,
                stage.name,
                if inputs.is_empty() { "(source)".to_string() } else { inputs.join(" ") },
                stage.output
            ));
            for filter in &stage.filters {
                let options: Vec<String> = filter
                    .options()
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                out.push_str(&format!("       {} {}\n", filter.name(), options.join(" ")));
            }
        }
        out
    }
}
