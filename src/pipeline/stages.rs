//! The five stage handlers.
//!
//! Each is a pure composition: render the prompt, call the completion
//! client, recover structured output, validate, return. The completion
//! client arrives as an explicit parameter; stages hold no state of their
//! own, so the server stays stateless between pipeline calls.

use serde_json::Value;

use crate::config::GenerationParams;

use super::completion::CompletionClient;
use super::schema::{
    self, SeoReport, Step1Request, Step1Result, Step2Request, Step2Result, Step3Request,
    Step3Result, Step4Request, Step5Request,
};
use super::{html, prompts, recovery, PipelineError, Stage};

/// Research-stage item caps, enforced post-hoc on top of the prompt text.
const MAX_EXPERT_INSIGHTS: usize = 2;
const MAX_STATS: usize = 3;
const MAX_FAQ: usize = 3;

/// Research-stage generation overrides: small output cap, low temperature.
const RESEARCH_MAX_TOKENS: u32 = 1200;
const RESEARCH_TEMPERATURE: f32 = 0.3;

fn recover_json(raw: &str, stage: Stage) -> Result<Value, PipelineError> {
    recovery::recover(raw).map_err(|e| PipelineError::Parse {
        stage,
        message: e.to_string(),
    })
}

fn parse_failure(stage: Stage, message: String) -> PipelineError {
    PipelineError::Parse { stage, message }
}

/// Stage 1 — keyword discovery.
pub async fn run_step1(
    client: &CompletionClient,
    request: &Step1Request,
    caller: &str,
) -> Result<Step1Result, PipelineError> {
    let stage = Stage::Keywords;
    let prompt = prompts::step1_prompt(&request.initial_subject);
    let raw = client.complete(&prompt, stage, caller).await?;
    let value = recover_json(&raw, stage)?;
    schema::validate_step1_result(&value).map_err(|m| parse_failure(stage, m))
}

/// Stage 2 — outline and meta data.
pub async fn run_step2(
    client: &CompletionClient,
    request: &Step2Request,
    caller: &str,
) -> Result<Step2Result, PipelineError> {
    let stage = Stage::Outline;
    let prompt = prompts::step2_prompt(&request.final_subject, &request.keywords);
    let raw = client.complete(&prompt, stage, caller).await?;
    let value = recover_json(&raw, stage)?;
    schema::validate_step2_result(&value).map_err(|m| parse_failure(stage, m))
}

/// Stage 3 — research citations, with lenient coercion: missing or
/// non-array keys become empty arrays, oversized arrays are truncated to
/// the advertised caps.
pub async fn run_step3(
    client: &CompletionClient,
    request: &Step3Request,
    caller: &str,
) -> Result<Step3Result, PipelineError> {
    let stage = Stage::Research;
    let prompt = prompts::step3_prompt(&request.final_subject, &request.article_outline);
    let params = GenerationParams {
        temperature: RESEARCH_TEMPERATURE,
        max_output_tokens: RESEARCH_MAX_TOKENS,
        ..client.params().clone()
    };
    let raw = client.complete_with(&prompt, stage, caller, params).await?;
    let value = recover_json(&raw, stage)?;

    let coerced = serde_json::json!({
        "expertInsights": capped_array(&value, "expertInsights", MAX_EXPERT_INSIGHTS),
        "stats": capped_array(&value, "stats", MAX_STATS),
        "faq": capped_array(&value, "faq", MAX_FAQ),
    });
    let result =
        schema::validate_step3_result(&coerced).map_err(|m| parse_failure(stage, m))?;

    tracing::debug!(
        caller,
        expert_insights = result.expert_insights.len(),
        stats = result.stats.len(),
        faq = result.faq.len(),
        "research payload coerced"
    );
    Ok(result)
}

fn capped_array(value: &Value, key: &str, cap: usize) -> Vec<Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.iter().take(cap).cloned().collect(),
        _ => Vec::new(),
    }
}

/// Stage 4 — article assembly. Returns a body-level HTML fragment; the
/// document scaffold the model was asked to produce is stripped away.
pub async fn run_step4(
    client: &CompletionClient,
    request: &Step4Request,
    caller: &str,
) -> Result<String, PipelineError> {
    let stage = Stage::Article;
    let prompt = prompts::step4_prompt(request);
    let raw = client.complete(&prompt, stage, caller).await?;
    let body = html::extract_body(&raw);
    if body.is_empty() {
        return Err(parse_failure(stage, "generated document has no body content".into()));
    }
    Ok(body)
}

/// Stage 5 — SEO scoring. The one stage that degrades instead of failing:
/// any completion, parse or validation failure yields a fixed advisory
/// report so a finished article is never lost to a broken score.
pub async fn run_step5(client: &CompletionClient, request: &Step5Request, caller: &str) -> SeoReport {
    let stage = Stage::SeoReport;
    let prompt = prompts::step5_prompt(&request.html_article, &request.keywords);

    let attempt = async {
        let raw = client.complete(&prompt, stage, caller).await?;
        let value = recover_json(&raw, stage)?;
        schema::validate_seo_report(&value).map_err(|m| parse_failure(stage, m))
    };

    match attempt.await {
        Ok(mut report) => {
            report.scor_general = report.scor_general.clamp(0.0, 100.0);
            report
        }
        Err(error) => {
            tracing::warn!(caller, %error, "SEO report generation failed, serving fallback");
            fallback_seo_report()
        }
    }
}

fn fallback_seo_report() -> SeoReport {
    SeoReport {
        scor_general: 75.0,
        analiza_detaliata: serde_json::json!({
            "mesaj": "Raportul SEO nu a putut fi generat complet, dar articolul a fost creat cu succes."
        }),
        recomandari_prioritare: vec![
            "Verifică manual densitatea cuvintelor cheie".into(),
            "Asigură-te că structura H1-H3 este corectă".into(),
            "Revizuiește meta description și title".into(),
            "Verifică link-urile externe generate".into(),
        ],
        status_seo: "Parțial analizat".into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::config::RetryPolicy;
    use crate::pipeline::completion::MockGenerator;
    use crate::pipeline::schema::OutlineSection;

    use super::*;

    fn client(mock: Arc<MockGenerator>) -> CompletionClient {
        CompletionClient::new(
            mock,
            "primary-model",
            "fallback-model",
            GenerationParams {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 64,
                max_output_tokens: 24_000,
            },
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(4),
            },
        )
    }

    fn step1_payload() -> Value {
        json!({
            "subiect_final": "Cum previi burnoutul în echipele remote",
            "cuvant_cheie_principal": "burnout echipe remote",
            "cuvinte_cheie_secundare_lsi": ["epuizare profesională", "stres cronic"],
            "cuvinte_cheie_long_tail": ["semne de burnout la angajații remote"],
            "justificare_alegere": "volum de căutare bun"
        })
    }

    fn step2_payload() -> Value {
        json!({
            "structura_articol": [
                {"titlu_h2": "Ce este burnoutul", "subteme_h3": ["Definiție", "Cauze"]},
                {"titlu_h2": "Prevenție", "subteme_h3": ["Rutine sănătoase"]}
            ],
            "unghi_unic": "perspectiva managerului de echipă distribuită",
            "meta_titlu_propus": "Burnout în echipe remote: ghid complet",
            "meta_descriere_propusa": "Află cum recunoști și previi burnoutul."
        })
    }

    fn step3_payload() -> Value {
        json!({
            "expertInsights": [{"source": "OMS", "quote": "fenomen ocupațional"}],
            "stats": [{"label": "angajați afectați", "value": "77%", "source": "Gallup"}],
            "faq": [{"q": "Ce este burnoutul?", "a": "Stres cronic la locul de muncă."}]
        })
    }

    #[tokio::test]
    async fn step1_parses_fenced_output() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(&format!("```json\n{}\n```", step1_payload()));

        let request = Step1Request {
            initial_subject: "remote team burnout".into(),
        };
        let result = run_step1(&client(mock), &request, "tester").await.unwrap();
        assert_eq!(result.cuvant_cheie_principal, "burnout echipe remote");
        assert_eq!(result.cuvinte_cheie_secundare_lsi.len(), 2);
    }

    #[tokio::test]
    async fn step1_invalid_output_is_a_stage_labeled_parse_error() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(r#"{"subiect_final": "ok"}"#);

        let request = Step1Request {
            initial_subject: "remote team burnout".into(),
        };
        let err = run_step1(&client(mock), &request, "tester").await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse { stage: Stage::Keywords, .. }));
        assert!(err.to_string().contains("cuvant_cheie_principal"));
    }

    #[tokio::test]
    async fn step3_truncates_oversized_arrays() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(
            &json!({
                "expertInsights": [],
                "stats": [
                    {"label": "a", "value": 1, "source": "s"},
                    {"label": "b", "value": 2, "source": "s"},
                    {"label": "c", "value": 3, "source": "s"},
                    {"label": "d", "value": 4, "source": "s"},
                    {"label": "e", "value": 5, "source": "s"}
                ],
                "faq": [{"q": "q1", "a": "a1"}]
            })
            .to_string(),
        );

        let request = Step3Request {
            final_subject: "burnout echipe remote".into(),
            article_outline: vec![OutlineSection {
                titlu_h2: "Cauze".into(),
                subteme_h3: vec!["Izolare".into()],
            }],
        };
        let result = run_step3(&client(mock), &request, "tester").await.unwrap();
        assert_eq!(result.stats.len(), 3);
        assert_eq!(result.stats[2].label, "c");
    }

    #[tokio::test]
    async fn step3_coerces_missing_faq_to_empty() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(
            &json!({
                "expertInsights": [{"source": "OMS", "quote": "citat"}],
                "stats": "not an array"
            })
            .to_string(),
        );

        let request = Step3Request {
            final_subject: "burnout echipe remote".into(),
            article_outline: vec![OutlineSection {
                titlu_h2: "Cauze".into(),
                subteme_h3: vec!["Izolare".into()],
            }],
        };
        let result = run_step3(&client(mock), &request, "tester").await.unwrap();
        assert_eq!(result.expert_insights.len(), 1);
        assert!(result.stats.is_empty());
        assert!(result.faq.is_empty());
    }

    #[tokio::test]
    async fn step4_strips_the_document_scaffold() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(
            "<!DOCTYPE html><html><head><title>T</title></head>\
             <body><h1>Articol</h1><p>Conținut.</p></body></html>",
        );

        let request: Step4Request = serde_json::from_value(json!({
            "finalSubject": "burnout echipe remote",
            "step1Result": step1_payload(),
            "step2Result": step2_payload(),
            "step3Result": step3_payload()
        }))
        .unwrap();
        let body = run_step4(&client(mock), &request, "tester").await.unwrap();
        assert!(body.contains("<h1>Articol</h1>"));
        assert!(!body.contains("<html"));
        assert!(!body.contains("<head"));
    }

    #[tokio::test]
    async fn step5_clamps_high_scores_to_100() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(
            &json!({
                "scor_general": 145,
                "analiza_detaliata": {"cuvinte_cheie": {"scor": 90, "comentarii": "ok"}},
                "recomandari_prioritare": ["nimic"],
                "status_seo": "Excelent"
            })
            .to_string(),
        );

        let request = Step5Request {
            html_article: "<h1>Articol</h1>".into(),
            keywords: "burnout".into(),
        };
        let report = run_step5(&client(mock), &request, "tester").await;
        assert!((report.scor_general - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn step5_clamps_negative_scores_to_zero() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text(
            &json!({
                "scor_general": -10,
                "analiza_detaliata": {},
                "recomandari_prioritare": [],
                "status_seo": "Slab"
            })
            .to_string(),
        );

        let request = Step5Request {
            html_article: "<h1>Articol</h1>".into(),
            keywords: "burnout".into(),
        };
        let report = run_step5(&client(mock), &request, "tester").await;
        assert!(report.scor_general.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn step5_degrades_to_fallback_on_unusable_output() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_text("nu pot evalua acest articol");

        let request = Step5Request {
            html_article: "<h1>Articol</h1>".into(),
            keywords: "burnout".into(),
        };
        let report = run_step5(&client(mock), &request, "tester").await;
        assert!((report.scor_general - 75.0).abs() < f64::EPSILON);
        assert_eq!(report.status_seo, "Parțial analizat");
        assert_eq!(report.recomandari_prioritare.len(), 4);
    }

    #[tokio::test]
    async fn step5_degrades_to_fallback_on_completion_failure() {
        let mock = Arc::new(MockGenerator::new());
        mock.push_failure(Some(400), "bad generation config");

        let request = Step5Request {
            html_article: "<h1>Articol</h1>".into(),
            keywords: "burnout".into(),
        };
        let report = run_step5(&client(mock), &request, "tester").await;
        assert_eq!(report.status_seo, "Parțial analizat");
    }

    #[tokio::test]
    async fn full_pipeline_scenario() {
        let mock = Arc::new(MockGenerator::new());
        let shared = client(mock.clone());

        // Stage 1
        mock.push_text(&step1_payload().to_string());
        let step1 = run_step1(
            &shared,
            &Step1Request {
                initial_subject: "remote team burnout".into(),
            },
            "tester",
        )
        .await
        .unwrap();
        assert!(!step1.subiect_final.is_empty());

        // Stage 2, fed from stage 1
        mock.push_text(&step2_payload().to_string());
        let mut keywords = vec![step1.cuvant_cheie_principal.clone()];
        keywords.extend(step1.cuvinte_cheie_secundare_lsi.iter().cloned());
        let step2 = run_step2(
            &shared,
            &Step2Request {
                final_subject: step1.subiect_final.clone(),
                keywords: keywords.join(", "),
            },
            "tester",
        )
        .await
        .unwrap();
        assert!(!step2.structura_articol.is_empty());

        // Stage 3, fed from stage 2's outline
        mock.push_text(&step3_payload().to_string());
        let step3 = run_step3(
            &shared,
            &Step3Request {
                final_subject: step1.subiect_final.clone(),
                article_outline: step2.structura_articol.clone(),
            },
            "tester",
        )
        .await
        .unwrap();

        // Stage 4, fed from everything prior
        mock.push_text(
            "<html><body><h1>Articol final</h1><p>Text complet.</p></body></html>",
        );
        let html = run_step4(
            &shared,
            &Step4Request {
                final_subject: step1.subiect_final.clone(),
                step1_result: step1,
                step2_result: step2,
                step3_result: step3,
            },
            "tester",
        )
        .await
        .unwrap();
        assert!(!html.is_empty());
        assert!(!html.contains("<html"));
        assert!(!html.contains("<head"));

        // Stage 5, fed the assembled fragment
        mock.push_text(
            &json!({
                "scor_general": 88,
                "analiza_detaliata": {"cuvinte_cheie": {"scor": 90, "comentarii": "bun"}},
                "recomandari_prioritare": ["adaugă alt-text"],
                "status_seo": "Bun"
            })
            .to_string(),
        );
        let report = run_step5(
            &shared,
            &Step5Request {
                html_article: html,
                keywords: keywords.join(", "),
            },
            "tester",
        )
        .await;
        assert!((0.0..=100.0).contains(&report.scor_general));
    }
}
