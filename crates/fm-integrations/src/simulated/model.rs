use async_trait::async_trait;
use fm_core::types::{CodeBundle, ResearchOutput, Source, TestSuite};
use tracing::debug;

use super::{latency, Latency};
use crate::collaborators::{CodeGenerator, Researcher, TestGenerator};
use crate::error::{IntegrationError, Result};
use crate::generation::{self, Generated};
use crate::rng::Dice;

/// Generative model stand-in. Answers research prompts with a sectioned
/// text and generation prompts with fenced JSON; with probability
/// `malformed_rate` the JSON is truncated.
pub struct SimulatedModel {
    latency: Latency,
    dice: Dice,
    malformed_rate: f64,
}

impl SimulatedModel {
    pub fn new(latency: Latency, dice: Dice, malformed_rate: f64) -> Self {
        Self {
            latency,
            dice,
            malformed_rate,
        }
    }

    fn respond_json(&self, body: String) -> String {
        if self.dice.chance(self.malformed_rate) {
            let cut = body.len() / 2;
            let cut = (0..=cut).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            format!("```json\n{}", &body[..cut])
        } else {
            format!("```json\n{body}\n```")
        }
    }
}

fn research_text(topic: &str) -> String {
    format!(
        "Summary:\n{topic} combines a managed backend with a generative model behind a thin API layer.\n\n\
         Key Findings:\n\
         - Keep model calls behind a server-side function to protect credentials\n\
         - Stream partial responses to keep the interface responsive\n\
         - Cache embeddings and repeated prompts to control cost\n\n\
         Technical Requirements:\n\
         - Serverless function runtime with secret management\n\
         - Structured JSON responses for downstream tooling\n"
    )
}

#[async_trait]
impl Researcher for SimulatedModel {
    async fn conduct_research(&self, topic: &str) -> Result<ResearchOutput> {
        self.latency.wait(latency::RESEARCH).await;
        let summary = research_text(topic);
        let key_findings = generation::extract_key_findings(&summary);
        debug!(topic, findings = key_findings.len(), "research complete");
        Ok(ResearchOutput {
            summary,
            sources: vec![
                Source {
                    title: "Firebase Documentation".into(),
                    uri: "https://firebase.google.com/docs".into(),
                },
                Source {
                    title: "Gemini API Reference".into(),
                    uri: "https://ai.google.dev/api".into(),
                },
            ],
            key_findings,
        })
    }
}

#[async_trait]
impl CodeGenerator for SimulatedModel {
    async fn generate_code(
        &self,
        topic: &str,
        research: &ResearchOutput,
    ) -> Result<Generated<CodeBundle>> {
        self.latency.wait(latency::CODEGEN).await;
        let bundle = CodeBundle {
            firebase: format!(
                "// {topic}\nexport const handler = onRequest(async (req, res) => {{\n  res.json({{ ok: true }});\n}});"
            ),
            ai_studio: format!(
                "// Prompt template\nconst prompt = `{}`;",
                research.key_findings.join("; ")
            ),
            replit: format!("# {topic}\nprint(\"demo ready\")"),
        };
        let body = serde_json::to_string(&bundle)
            .map_err(|e| IntegrationError::malformed("codegen", e.to_string()))?;
        Ok(generation::parse_code_bundle(&self.respond_json(body)))
    }
}

#[async_trait]
impl TestGenerator for SimulatedModel {
    async fn generate_tests(
        &self,
        topic: &str,
        _research: &ResearchOutput,
        code: &CodeBundle,
    ) -> Result<Generated<TestSuite>> {
        self.latency.wait(latency::TESTS).await;
        let body = serde_json::json!({
            "framework": "Jest",
            "testCode": format!(
                "describe('{topic}', () => {{\n  it('exports a handler', () => {{\n    expect({}).toBeDefined();\n  }});\n}});",
                code.firebase.lines().count()
            ),
        })
        .to_string();
        Ok(generation::parse_test_suite(&self.respond_json(body)))
    }
}
