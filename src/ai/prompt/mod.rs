//! Prompt Builder
//!
//! Structured prompt construction for the research connectors, plus the
//! JSON schemas the LLM analyzer and summary generator ask for.

use serde_json::{Value, json};

use crate::constants::llm::MAX_PROMPT_MATERIAL_CHARS;
use crate::research::types::{AnalysisResult, CollectedData, ResearchPlan};

#[derive(Debug, Clone)]
enum PromptSection {
    Role { expertise: String, task: String },
    Objectives(Vec<String>),
    Context(Vec<(String, String)>),
    Text {
        header: Option<String>,
        content: String,
    },
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
}

/// Builder producing tagged, sectioned prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add a key/value to the context block, keeping insertion order
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let entry = (key.to_string(), value.to_string());
        match self
            .sections
            .iter_mut()
            .find_map(|s| match s {
                PromptSection::Context(ctx) => Some(ctx),
                _ => None,
            }) {
            Some(ctx) => ctx.push(entry),
            None => self.sections.push(PromptSection::Context(vec![entry])),
        }
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!("You are a {} working on {}.\n", expertise, task));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(ctx) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in ctx {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("Stay on this question: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Render collected items as a bounded material block
pub fn render_material(data: &CollectedData) -> String {
    if data.is_empty() {
        return "(no material was collected)".to_string();
    }

    let mut out = String::new();
    for (i, item) in data.items.iter().enumerate() {
        let entry = format!(
            "[{}] ({}) {}\n{}\n\n",
            i + 1,
            item.source,
            item.title,
            item.snippet
        );
        if out.len() + entry.len() > MAX_PROMPT_MATERIAL_CHARS {
            out.push_str(&format!(
                "... {} more items omitted\n",
                data.items.len() - i
            ));
            break;
        }
        out.push_str(&entry);
    }
    out.trim_end().to_string()
}

pub fn analysis_prompt(plan: &ResearchPlan, data: &CollectedData) -> String {
    PromptBuilder::new()
        .role("research analyst", "synthesizing collected source material")
        .objectives(vec![
            "Extract the key findings the material supports",
            "Name the recurring themes",
            "Rate your confidence between 0 and 1 given how much material there is",
            "Write a short analysis summary",
        ])
        .context_item("Query", &plan.query)
        .context_item("Category", plan.category.as_str())
        .context_item("Key concepts", &plan.key_concepts.join(", "))
        .section("Material", &render_material(data))
        .focus(
            &plan.query,
            vec![
                "Do not invent sources or citations",
                "Lower confidence when the material is thin or off-topic",
            ],
        )
        .build()
}

pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "key_findings": {"type": "array", "items": {"type": "string"}},
            "themes": {"type": "array", "items": {"type": "string"}},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "analysis_summary": {"type": "string"}
        },
        "required": ["key_findings", "themes", "confidence", "analysis_summary"]
    })
}

pub fn summary_prompt(plan: &ResearchPlan, analysis: &AnalysisResult) -> String {
    let findings = analysis
        .key_findings
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    PromptBuilder::new()
        .role("science writer", "executive summaries of research reports")
        .objectives(vec![
            "Write a two to four sentence executive summary",
            "Mention the strongest findings first",
        ])
        .context_item("Query", &plan.query)
        .context_item("Themes", &analysis.themes.join(", "))
        .context_item("Confidence", &format!("{:.2}", analysis.confidence))
        .section("Findings", &findings)
        .build()
}

pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "executive_summary": {"type": "string"}
        },
        "required": ["executive_summary"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::planner::analyze_query;
    use crate::research::types::SourceItem;

    #[test]
    fn test_builder_sections_in_order() {
        let prompt = PromptBuilder::new()
            .role("research analyst", "a test")
            .objectives(vec!["First", "Second"])
            .context_item("Query", "q")
            .context_item("Category", "general")
            .build();

        assert!(prompt.starts_with("<ROLE>"));
        assert!(prompt.contains("1. First\n2. Second"));
        let query = prompt.find("**Query**").unwrap();
        let category = prompt.find("**Category**").unwrap();
        assert!(query < category);
        assert_eq!(prompt.matches("# Context").count(), 1);
    }

    #[test]
    fn test_analysis_prompt_mentions_query_and_material() {
        let plan = analyze_query("quantum computing").unwrap();
        let data = CollectedData::from_items(
            vec![SourceItem {
                source: "arxiv".into(),
                category: "academic".into(),
                title: "Qubits at scale".into(),
                snippet: "We report...".into(),
                url: None,
            }],
            vec!["arxiv".into()],
        );

        let prompt = analysis_prompt(&plan, &data);
        assert!(prompt.contains("quantum computing"));
        assert!(prompt.contains("Qubits at scale"));
        assert!(prompt.contains("<FOCUS>"));
    }

    #[test]
    fn test_material_is_bounded() {
        let items = (0..500)
            .map(|i| SourceItem {
                source: "web".into(),
                category: "web".into(),
                title: format!("title {}", i),
                snippet: "x".repeat(200),
                url: None,
            })
            .collect();
        let data = CollectedData::from_items(items, vec!["web".into()]);

        let material = render_material(&data);
        assert!(material.len() <= MAX_PROMPT_MATERIAL_CHARS + 64);
        assert!(material.contains("more items omitted"));
    }

    #[test]
    fn test_empty_material() {
        assert!(render_material(&CollectedData::empty()).contains("no material"));
    }
}
