// src/core/template.rs

use crate::core::tasks::Task;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // `{}` or `{N}`. Other brace text is left alone.
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{(\d*)\}").unwrap();
}

/// A pre-parsed piece of the command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateComponent {
    Literal(String),
    /// `{}`: the next value in task-list order.
    Next,
    /// `{N}`: the N-th value (1-based).
    Position(usize),
}

/// The user's command string, parsed once and rendered per task group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    components: Vec<TemplateComponent>,
}

impl CommandTemplate {
    pub fn parse(source: &str) -> Self {
        let mut components = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(source) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let component = if digits.as_str().is_empty() {
                TemplateComponent::Next
            } else {
                match digits.as_str().parse::<usize>() {
                    Ok(n) if n >= 1 => TemplateComponent::Position(n),
                    // `{0}` and absurdly large indices stay literal text.
                    _ => continue,
                }
            };
            if let Some(text) = source.get(last..whole.start()).filter(|t| !t.is_empty()) {
                components.push(TemplateComponent::Literal(text.to_string()));
            }
            components.push(component);
            last = whole.end();
        }
        if let Some(text) = source.get(last..).filter(|t| !t.is_empty()) {
            components.push(TemplateComponent::Literal(text.to_string()));
        }

        Self {
            source: source.to_string(),
            components,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        self.components
            .iter()
            .filter(|c| !matches!(c, TemplateComponent::Literal(_)))
            .count()
    }

    /// Renders the literal command line for one task group.
    ///
    /// Values not claimed by any placeholder are appended as extra arguments,
    /// in task-list order. No escaping is applied.
    pub fn render(&self, group: &[Task]) -> String {
        let mut used = vec![false; group.len()];
        let mut next = 0;
        let mut line = String::with_capacity(self.source.len() + group.len() * 16);

        for component in &self.components {
            match component {
                TemplateComponent::Literal(text) => line.push_str(text),
                TemplateComponent::Next => {
                    if let Some(task) = group.get(next) {
                        line.push_str(task.value());
                        if let Some(flag) = used.get_mut(next) {
                            *flag = true;
                        }
                    }
                    next += 1;
                }
                TemplateComponent::Position(n) => {
                    let index = n.saturating_sub(1);
                    if let Some(task) = group.get(index) {
                        line.push_str(task.value());
                        if let Some(flag) = used.get_mut(index) {
                            *flag = true;
                        }
                    }
                }
            }
        }

        // Template text is kept as written; a separator is only added when the
        // line does not already end in whitespace.
        for (task, _) in group.iter().zip(&used).filter(|(_, used)| !**used) {
            if !line.is_empty() && !line.ends_with(char::is_whitespace) {
                line.push(' ');
            }
            line.push_str(task.value());
        }
        line
    }
}
