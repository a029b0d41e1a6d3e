use std::fmt::Write;

/// Indentation-aware line buffer for emitted source.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    const INDENT: &'static str = "    ";

    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one line at the current depth; empty lines carry no indentation.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(Self::INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Writes `header {`, runs `body` one level deeper, then closes with `}` + `suffix`.
    pub fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) -> &mut Self {
        self.block_with(header, "", body)
    }

    pub fn block_with(
        &mut self,
        header: impl AsRef<str>,
        suffix: &str,
        body: impl FnOnce(&mut Self),
    ) -> &mut Self {
        let header = header.as_ref();
        if header.is_empty() {
            self.line("{");
        } else {
            self.line(format!("{} {{", header));
        }
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self.line(format!("}}{}", suffix))
    }

    /// Writes `header { then } else { otherwise }`.
    pub fn block_else(
        &mut self,
        header: impl AsRef<str>,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) -> &mut Self {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
        then(self);
        self.depth -= 1;
        self.line("} else {");
        self.depth += 1;
        otherwise(self);
        self.depth -= 1;
        self.line("}")
    }

    /// Appends a `///` doc line.
    pub fn doc(&mut self, text: impl AsRef<str>) -> &mut Self {
        let mut line = String::from("///");
        let text = text.as_ref();
        if !text.is_empty() {
            let _ = write!(line, " {}", text);
        }
        self.line(line)
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_indent() {
        let mut w = CodeWriter::new();
        w.block("fn f()", |w| {
            w.block("if x", |w| {
                w.line("y();");
            });
            w.blank();
        });
        assert_eq!(
            w.finish(),
            "fn f() {\n    if x {\n        y();\n    }\n\n}\n"
        );
    }

    #[test]
    fn else_branch_shares_the_closing_line() {
        let mut w = CodeWriter::new();
        w.block_else(
            "if x",
            |w| {
                w.line("a();");
            },
            |w| {
                w.line("b();");
            },
        );
        assert_eq!(w.finish(), "if x {\n    a();\n} else {\n    b();\n}\n");
    }
}
