//! Per-stage request/result contracts.
//!
//! Validation runs in two passes: a value-level check over the raw
//! `serde_json::Value` that collects EVERY violated constraint (the caller
//! sees the complete problem set in one round trip, semicolon-joined), then
//! a serde deserialization into the typed struct, which drops unknown
//! fields. Wire field names stay as the client sends them; result field
//! names stay as the model emits them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum length for free-text request fields.
const MIN_TEXT_LEN: usize = 3;

// ═══════════════════════════════════════════════════════════════════════════
// Request shapes (camelCase on the wire)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step1Request {
    #[serde(rename = "initialSubject")]
    pub initial_subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step2Request {
    #[serde(rename = "finalSubject")]
    pub final_subject: String,
    /// Combined keyword string (principal + secondary, comma-joined by the
    /// client from the stage-1 result).
    pub keywords: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step3Request {
    #[serde(rename = "finalSubject")]
    pub final_subject: String,
    #[serde(rename = "articleOutline")]
    pub article_outline: Vec<OutlineSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step4Request {
    #[serde(rename = "finalSubject")]
    pub final_subject: String,
    #[serde(rename = "step1Result")]
    pub step1_result: Step1Result,
    #[serde(rename = "step2Result")]
    pub step2_result: Step2Result,
    #[serde(rename = "step3Result")]
    pub step3_result: Step3Result,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step5Request {
    #[serde(rename = "htmlArticle")]
    pub html_article: String,
    pub keywords: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Result shapes (model-emitted field names)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step1Result {
    pub subiect_final: String,
    pub cuvant_cheie_principal: String,
    pub cuvinte_cheie_secundare_lsi: Vec<String>,
    pub cuvinte_cheie_long_tail: Vec<String>,
    pub justificare_alegere: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub titlu_h2: String,
    pub subteme_h3: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step2Result {
    pub structura_articol: Vec<OutlineSection>,
    pub unghi_unic: String,
    pub meta_titlu_propus: String,
    pub meta_descriere_propusa: String,
}

/// Compact research payload. Entry fields default when the model omits
/// them; the three top-level keys themselves are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertInsight {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub a: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step3Result {
    #[serde(rename = "expertInsights")]
    pub expert_insights: Vec<ExpertInsight>,
    pub stats: Vec<StatEntry>,
    pub faq: Vec<FaqEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoReport {
    pub scor_general: f64,
    pub analiza_detaliata: Value,
    pub recomandari_prioritare: Vec<String>,
    pub status_seo: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Violation collection
// ═══════════════════════════════════════════════════════════════════════════

/// Accumulates constraint violations so one validation pass reports all of
/// them, not just the first.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<String>,
}

impl Violations {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Semicolon-joined message, or `Ok(())` when nothing was violated.
    pub fn into_result(self) -> Result<(), String> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(self.items.join("; "))
        }
    }
}

fn field_at<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn check_string(data: &Value, path: &str, min_len: usize, out: &mut Violations) {
    match field_at(data, path) {
        None | Some(Value::Null) => out.push(format!("\"{path}\" is required")),
        Some(Value::String(s)) => {
            if s.trim().chars().count() < min_len {
                out.push(format!(
                    "\"{path}\" length must be at least {min_len} characters long"
                ));
            }
        }
        Some(_) => out.push(format!("\"{path}\" must be a string")),
    }
}

fn check_array(data: &Value, path: &str, min_items: usize, out: &mut Violations) {
    match field_at(data, path) {
        None | Some(Value::Null) => out.push(format!("\"{path}\" is required")),
        Some(Value::Array(items)) => {
            if items.len() < min_items {
                out.push(format!("\"{path}\" must contain at least {min_items} items"));
            }
        }
        Some(_) => out.push(format!("\"{path}\" must be an array")),
    }
}

fn check_object(data: &Value, path: &str, out: &mut Violations) -> bool {
    match field_at(data, path) {
        None | Some(Value::Null) => {
            out.push(format!("\"{path}\" is required"));
            false
        }
        Some(Value::Object(_)) => true,
        Some(_) => {
            out.push(format!("\"{path}\" must be an object"));
            false
        }
    }
}

fn check_number(data: &Value, path: &str, out: &mut Violations) {
    match field_at(data, path) {
        None | Some(Value::Null) => out.push(format!("\"{path}\" is required")),
        Some(Value::Number(_)) => {}
        Some(_) => out.push(format!("\"{path}\" must be a number")),
    }
}

fn deserialize_checked<T: serde::de::DeserializeOwned>(data: &Value) -> Result<T, String> {
    serde_json::from_value(data.clone()).map_err(|e| e.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════
// Request validators
// ═══════════════════════════════════════════════════════════════════════════

pub fn validate_step1_request(data: &Value) -> Result<Step1Request, String> {
    let mut v = Violations::default();
    check_string(data, "initialSubject", MIN_TEXT_LEN, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_step2_request(data: &Value) -> Result<Step2Request, String> {
    let mut v = Violations::default();
    check_string(data, "finalSubject", MIN_TEXT_LEN, &mut v);
    check_string(data, "keywords", MIN_TEXT_LEN, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_step3_request(data: &Value) -> Result<Step3Request, String> {
    let mut v = Violations::default();
    check_string(data, "finalSubject", MIN_TEXT_LEN, &mut v);
    check_array(data, "articleOutline", 1, &mut v);
    if let Some(Value::Array(sections)) = field_at(data, "articleOutline") {
        for (i, section) in sections.iter().enumerate() {
            check_outline_section(section, "articleOutline", i, &mut v);
        }
    }
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_step4_request(data: &Value) -> Result<Step4Request, String> {
    let mut v = Violations::default();
    check_string(data, "finalSubject", MIN_TEXT_LEN, &mut v);

    if check_object(data, "step1Result", &mut v) {
        check_string(data, "step1Result.subiect_final", MIN_TEXT_LEN, &mut v);
        check_string(data, "step1Result.cuvant_cheie_principal", 1, &mut v);
        check_array(data, "step1Result.cuvinte_cheie_secundare_lsi", 1, &mut v);
        check_array(data, "step1Result.cuvinte_cheie_long_tail", 1, &mut v);
        check_string(data, "step1Result.justificare_alegere", 1, &mut v);
    }
    if check_object(data, "step2Result", &mut v) {
        check_array(data, "step2Result.structura_articol", 1, &mut v);
        check_string(data, "step2Result.unghi_unic", 1, &mut v);
        check_string(data, "step2Result.meta_titlu_propus", 1, &mut v);
        check_string(data, "step2Result.meta_descriere_propusa", 1, &mut v);
    }
    if check_object(data, "step3Result", &mut v) {
        check_array(data, "step3Result.expertInsights", 0, &mut v);
        check_array(data, "step3Result.stats", 0, &mut v);
        check_array(data, "step3Result.faq", 0, &mut v);
    }
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_step5_request(data: &Value) -> Result<Step5Request, String> {
    let mut v = Violations::default();
    check_string(data, "htmlArticle", MIN_TEXT_LEN, &mut v);
    check_string(data, "keywords", MIN_TEXT_LEN, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

// ═══════════════════════════════════════════════════════════════════════════
// Result validators (model output, after JSON recovery)
// ═══════════════════════════════════════════════════════════════════════════

pub fn validate_step1_result(data: &Value) -> Result<Step1Result, String> {
    let mut v = Violations::default();
    check_string(data, "subiect_final", MIN_TEXT_LEN, &mut v);
    check_string(data, "cuvant_cheie_principal", 1, &mut v);
    check_array(data, "cuvinte_cheie_secundare_lsi", 1, &mut v);
    check_array(data, "cuvinte_cheie_long_tail", 1, &mut v);
    check_string(data, "justificare_alegere", 1, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_step2_result(data: &Value) -> Result<Step2Result, String> {
    let mut v = Violations::default();
    check_array(data, "structura_articol", 1, &mut v);
    if let Some(Value::Array(sections)) = field_at(data, "structura_articol") {
        for (i, section) in sections.iter().enumerate() {
            check_outline_section(section, "structura_articol", i, &mut v);
        }
    }
    check_string(data, "unghi_unic", 1, &mut v);
    check_string(data, "meta_titlu_propus", 1, &mut v);
    check_string(data, "meta_descriere_propusa", 1, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

/// The three top-level keys must exist as arrays (empty is fine); item
/// shapes are lenient.
pub fn validate_step3_result(data: &Value) -> Result<Step3Result, String> {
    let mut v = Violations::default();
    check_array(data, "expertInsights", 0, &mut v);
    check_array(data, "stats", 0, &mut v);
    check_array(data, "faq", 0, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

pub fn validate_seo_report(data: &Value) -> Result<SeoReport, String> {
    let mut v = Violations::default();
    check_number(data, "scor_general", &mut v);
    check_object(data, "analiza_detaliata", &mut v);
    check_array(data, "recomandari_prioritare", 0, &mut v);
    check_string(data, "status_seo", 1, &mut v);
    v.into_result()?;
    deserialize_checked(data)
}

/// Check one outline section, anchoring violations under `prefix.index`.
fn check_outline_section(section: &Value, prefix: &str, index: usize, out: &mut Violations) {
    let mut scratch = Violations::default();
    check_string(section, "titlu_h2", 1, &mut scratch);
    check_array(section, "subteme_h3", 1, &mut scratch);
    for item in scratch.items {
        // `"titlu_h2" ...` becomes `"structura_articol.1.titlu_h2" ...`
        out.push(format!("\"{prefix}.{index}.{}", &item[1..]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_step1_result() -> Value {
        json!({
            "subiect_final": "Cum previi burnoutul în echipele remote",
            "cuvant_cheie_principal": "burnout echipe remote",
            "cuvinte_cheie_secundare_lsi": ["epuizare profesională", "stres cronic"],
            "cuvinte_cheie_long_tail": ["semne de burnout la angajații remote"],
            "justificare_alegere": "volum de căutare bun, competiție moderată"
        })
    }

    fn valid_step2_result() -> Value {
        json!({
            "structura_articol": [
                {"titlu_h2": "Ce este burnoutul", "subteme_h3": ["Definiție", "Cauze"]},
                {"titlu_h2": "Prevenție", "subteme_h3": ["Rutine", "Limite"]}
            ],
            "unghi_unic": "perspectiva managerului de echipă distribuită",
            "meta_titlu_propus": "Burnout în echipe remote: ghid complet",
            "meta_descriere_propusa": "Află cum recunoști și previi burnoutul."
        })
    }

    fn valid_step3_result() -> Value {
        json!({
            "expertInsights": [{"source": "OMS", "quote": "fenomen ocupațional"}],
            "stats": [{"label": "angajați afectați", "value": "77%", "source": "Gallup"}],
            "faq": [{"q": "Ce este burnoutul?", "a": "Stres cronic la locul de muncă."}]
        })
    }

    #[test]
    fn step1_request_accepts_valid_subject() {
        let req = validate_step1_request(&json!({"initialSubject": "remote team burnout"})).unwrap();
        assert_eq!(req.initial_subject, "remote team burnout");
    }

    #[test]
    fn step1_request_rejects_short_subject() {
        let err = validate_step1_request(&json!({"initialSubject": "ab"})).unwrap_err();
        assert!(err.contains("at least 3 characters"));
    }

    #[test]
    fn step1_request_rejects_missing_subject() {
        let err = validate_step1_request(&json!({})).unwrap_err();
        assert_eq!(err, "\"initialSubject\" is required");
    }

    #[test]
    fn step2_request_reports_both_missing_fields() {
        let err = validate_step2_request(&json!({})).unwrap_err();
        assert!(err.contains("\"finalSubject\" is required"));
        assert!(err.contains("\"keywords\" is required"));
        assert!(err.contains("; "));
    }

    #[test]
    fn step4_request_names_every_missing_nested_field() {
        // Two broken nested fields plus a complete rest of the payload
        let mut step1 = valid_step1_result();
        step1.as_object_mut().unwrap().remove("cuvant_cheie_principal");
        let mut step2 = valid_step2_result();
        step2.as_object_mut().unwrap().remove("unghi_unic");
        let data = json!({
            "finalSubject": "burnout echipe remote",
            "step1Result": step1,
            "step2Result": step2,
            "step3Result": valid_step3_result()
        });
        let err = validate_step4_request(&data).unwrap_err();
        assert!(err.contains("\"step1Result.cuvant_cheie_principal\" is required"));
        assert!(err.contains("\"step2Result.unghi_unic\" is required"));
    }

    #[test]
    fn step4_request_accepts_complete_payload() {
        let data = json!({
            "finalSubject": "burnout echipe remote",
            "step1Result": valid_step1_result(),
            "step2Result": valid_step2_result(),
            "step3Result": valid_step3_result()
        });
        let req = validate_step4_request(&data).unwrap();
        assert_eq!(req.step2_result.structura_articol.len(), 2);
        assert_eq!(req.step3_result.faq.len(), 1);
    }

    #[test]
    fn step3_result_requires_all_three_keys() {
        let err = validate_step3_result(&json!({"stats": []})).unwrap_err();
        assert!(err.contains("\"expertInsights\" is required"));
        assert!(err.contains("\"faq\" is required"));
    }

    #[test]
    fn step3_result_accepts_empty_arrays() {
        let result =
            validate_step3_result(&json!({"expertInsights": [], "stats": [], "faq": []})).unwrap();
        assert!(result.expert_insights.is_empty());
        assert!(result.stats.is_empty());
        assert!(result.faq.is_empty());
    }

    #[test]
    fn step1_result_rejects_empty_keyword_arrays() {
        let mut data = valid_step1_result();
        data["cuvinte_cheie_secundare_lsi"] = json!([]);
        let err = validate_step1_result(&data).unwrap_err();
        assert!(err.contains("\"cuvinte_cheie_secundare_lsi\" must contain at least 1 items"));
    }

    #[test]
    fn step2_result_flags_broken_section() {
        let mut data = valid_step2_result();
        data["structura_articol"][1]["subteme_h3"] = json!([]);
        let err = validate_step2_result(&data).unwrap_err();
        assert!(err.contains("structura_articol.1.subteme_h3"));
    }

    #[test]
    fn unknown_fields_are_stripped() {
        let mut data = valid_step1_result();
        data["campanie_interna"] = json!("should vanish");
        let result = validate_step1_result(&data).unwrap();
        let round_tripped = serde_json::to_value(&result).unwrap();
        assert!(round_tripped.get("campanie_interna").is_none());
    }

    #[test]
    fn seo_report_requires_numeric_score() {
        let err = validate_seo_report(&json!({
            "scor_general": "nouăzeci",
            "analiza_detaliata": {},
            "recomandari_prioritare": [],
            "status_seo": "Excelent"
        }))
        .unwrap_err();
        assert!(err.contains("\"scor_general\" must be a number"));
    }

    #[test]
    fn seo_report_accepts_valid_payload() {
        let report = validate_seo_report(&json!({
            "scor_general": 87.5,
            "analiza_detaliata": {"cuvinte_cheie": {"scor": 90, "comentariu": "bun"}},
            "recomandari_prioritare": ["adaugă alt-text la imagini"],
            "status_seo": "Foarte bine optimizat"
        }))
        .unwrap();
        assert!((report.scor_general - 87.5).abs() < f64::EPSILON);
    }
}
