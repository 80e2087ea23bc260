use crate::foundation::core::{Canvas, Rect};

/// One filter instance inside a chain, e.g. `scale@studio_1=w=640:h=360`.
///
/// Filters with an `instance` name become addressable nodes: their id (`name@instance`) is the
/// target of live parameter commands.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub name: &'static str,
    pub instance: Option<String>,
    pub args: Vec<(&'static str, String)>,
}

impl Filter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            instance: None,
            args: Vec::new(),
        }
    }

    fn arg(mut self, key: &'static str, value: impl ToString) -> Self {
        self.args.push((key, value.to_string()));
        self
    }

    /// Give this filter an addressable instance name.
    pub fn named(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Engine-level node id (`name@instance`) if this filter is addressable.
    pub fn node_id(&self) -> Option<String> {
        self.instance
            .as_ref()
            .map(|instance| format!("{}@{}", self.name, instance))
    }

    pub fn framerate(fps: u32) -> Self {
        Self::new("framerate").arg("fps", fps)
    }

    pub fn split(outputs: usize) -> Self {
        Self::new("split").arg("outputs", outputs)
    }

    pub fn aresample() -> Self {
        Self::new("aresample")
            .arg("async", 1)
            .arg("min_hard_comp", "0.100000")
            .arg("first_pts", 0)
    }

    pub fn volume(gain: f64) -> Self {
        Self::new("volume").arg("volume", gain)
    }

    /// Crop the source to `aspect`: width is cut when the source is wider, height otherwise.
    pub fn crop_to_aspect(aspect: f64) -> Self {
        Self::new("crop")
            .arg("w", format!("if(gt(a,{aspect}),{aspect}*ih,iw)"))
            .arg("h", format!("if(lt(a,{aspect}),{}*iw,ih)", 1.0 / aspect))
    }

    pub fn scale(width: u32, height: u32) -> Self {
        Self::new("scale").arg("w", width).arg("h", height)
    }

    pub fn pad(canvas: Canvas, at: Rect) -> Self {
        Self::new("pad")
            .arg("width", canvas.width)
            .arg("height", canvas.height)
            .arg("x", at.x)
            .arg("y", at.y)
    }

    pub fn overlay(x: i32, y: i32) -> Self {
        Self::new("overlay").arg("x", x).arg("y", y)
    }

    pub fn streamselect(inputs: usize, map: usize) -> Self {
        Self::new("streamselect")
            .arg("inputs", inputs)
            .arg("map", map)
    }

    pub fn zmq(bind_address: impl Into<String>) -> Self {
        Self::new("zmq").arg("bind_address", bind_address.into())
    }

    pub fn amix(inputs: usize) -> Self {
        Self::new("amix").arg("inputs", inputs)
    }

    /// Silent stereo source used when a vertex has no audio sockets.
    pub fn anullsrc() -> Self {
        Self::new("anullsrc")
            .arg("channel_layout", "stereo")
            .arg("sample_rate", 48_000)
    }

    /// Render in filtergraph syntax.
    pub fn render(&self) -> String {
        let mut out = String::from(self.name);
        if let Some(instance) = &self.instance {
            out.push('@');
            out.push_str(instance);
        }
        for (i, (key, value)) in self.args.iter().enumerate() {
            out.push(if i == 0 { '=' } else { ':' });
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_value(value));
        }
        out
    }
}

/// Quote a filter option value if it contains filtergraph or option separators.
pub(crate) fn quote_value(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| matches!(c, ',' | ';' | '[' | ']' | ':' | '=' | '\'' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/filters.rs"]
mod tests;
