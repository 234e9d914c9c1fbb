//! Minimal INI document builder for quadlet unit files.
//!
//! Keys are written in the order they are pushed, never map-iteration
//! order, so callers control the fixed key order deterministic output
//! requires.

pub struct IniDocument {
    sections: Vec<(String, Vec<String>)>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self { sections: Vec::new() }
    }

    /// Start a new section. Empty sections are dropped on render.
    pub fn section(&mut self, name: &str) -> &mut Self {
        self.sections.push((name.to_string(), Vec::new()));
        self
    }

    /// Append a `Key=Value` line to the most recently opened section.
    pub fn entry(&mut self, key: &str, value: impl AsRef<str>) -> &mut Self {
        let lines = &mut self.sections.last_mut().expect("section() called first").1;
        lines.push(format!("{key}={}", value.as_ref()));
        self
    }

    /// Append a raw comment line to the most recently opened section.
    pub fn comment(&mut self, text: impl AsRef<str>) -> &mut Self {
        let lines = &mut self.sections.last_mut().expect("section() called first").1;
        lines.push(format!("# {}", text.as_ref()));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, lines) in &self.sections {
            if lines.is_empty() {
                continue;
            }
            out.push_str(&format!("[{name}]\n"));
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

impl Default for IniDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_are_dropped() {
        let mut doc = IniDocument::new();
        doc.section("Unit");
        doc.section("Container").entry("Image", "nginx:1.25");
        assert_eq!(doc.render(), "[Container]\nImage=nginx:1.25\n\n");
    }

    #[test]
    fn entries_preserve_push_order_not_sorted_order() {
        let mut doc = IniDocument::new();
        doc.section("Container");
        doc.entry("Network", "b_net");
        doc.entry("Network", "a_net");
        assert_eq!(doc.render(), "[Container]\nNetwork=b_net\nNetwork=a_net\n\n");
    }
}
