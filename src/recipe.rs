use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// 解析失败时保留的原始响应长度（字符）
const RAW_PREVIEW_CHARS: usize = 200;

pub const PARSE_ERROR_NAME: &str = "Parse Error";

/// 从模型回答中提取的菜谱
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeRecord {
    #[serde(default)]
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: Vec<Value>,
    #[serde(default)]
    pub method: Vec<Value>,
    #[serde(default)]
    pub serving_size: String,
    #[serde(default)]
    pub additional_notes: String,
    /// 批量模式：视频文件名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_file: Option<String>,
    /// 批量模式：视频完整路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    /// 模型额外返回的字段，原样写回 JSON
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecipeRecord {
    /// 解析失败时的占位记录
    pub fn parse_error(error: &str, raw_text: &str) -> Self {
        let preview: String = raw_text.chars().take(RAW_PREVIEW_CHARS).collect();
        Self {
            recipe_name: PARSE_ERROR_NAME.to_string(),
            serving_size: "Unknown".to_string(),
            additional_notes: format!(
                "Failed to parse JSON: {}. Raw response: {}...",
                error, preview
            ),
            ..Default::default()
        }
    }

    pub fn is_parse_error(&self) -> bool {
        self.recipe_name == PARSE_ERROR_NAME && self.ingredients.is_empty() && self.method.is_empty()
    }

    /// 把 JSON 对象整理为记录，缺失字段取空值
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        Self {
            recipe_name: take_text(&mut object, "recipe_name"),
            ingredients: take_list(&mut object, "ingredients"),
            method: take_list(&mut object, "method"),
            serving_size: take_text(&mut object, "serving_size"),
            additional_notes: take_text(&mut object, "additional_notes"),
            video_file: take_optional_text(&mut object, "video_file"),
            video_path: take_optional_text(&mut object, "video_path"),
            extra: object,
        }
    }
}

fn take_text(object: &mut Map<String, Value>, key: &str) -> String {
    match object.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn take_optional_text(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    Some(take_text(object, key)).filter(|s| !s.is_empty())
}

fn take_list(object: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match object.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(other) => vec![other],
    }
}

/// 从回答中截取 JSON 的策略，按 [`ExtractionStrategy::ORDER`] 依次尝试，第一个命中的生效
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// "```json" 与其后第一个 "```" 之间的内容
    JsonFence,
    /// 第一个 "```" 与其后第一个 "```" 之间的内容
    AnyFence,
    /// 整段文本
    WholeText,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::AnyFence,
        ExtractionStrategy::WholeText,
    ];

    fn try_extract(self, text: &str) -> Option<&str> {
        match self {
            ExtractionStrategy::JsonFence => fenced(text, JSON_FENCE),
            ExtractionStrategy::AnyFence => fenced(text, FENCE),
            ExtractionStrategy::WholeText => Some(text.trim()),
        }
    }
}

/// 未闭合的代码块有意取到文本末尾，不丢弃最后一个字符
fn fenced<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// 返回命中的策略与待解析的子串
pub fn extract_json_candidate(text: &str) -> (ExtractionStrategy, &str) {
    ExtractionStrategy::ORDER
        .iter()
        .find_map(|s| s.try_extract(text).map(|candidate| (*s, candidate)))
        .unwrap_or((ExtractionStrategy::WholeText, text.trim()))
}

/// 把模型回答整理为 [`RecipeRecord`]，失败时返回占位记录，从不报错
pub fn structure_response(raw_text: &str) -> RecipeRecord {
    let (strategy, candidate) = extract_json_candidate(raw_text);
    debug!("JSON 提取策略: {:?}, {} 字符", strategy, candidate.len());

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => RecipeRecord::from_object(object),
        Ok(other) => {
            let error = format!("expected a JSON object, found {}", json_kind(&other));
            warn!("模型回答不是 JSON 对象: {}", error);
            RecipeRecord::parse_error(&error, raw_text)
        }
        Err(e) => {
            warn!("模型回答无法解析为 JSON: {}", e);
            RecipeRecord::parse_error(&e.to_string(), raw_text)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fence_wins_over_earlier_plain_fence() {
        let text = "intro ```text\nnot this``` then ```json\n{\"recipe_name\": \"Soup\"}\n``` bye";
        let (strategy, candidate) = extract_json_candidate(text);
        assert_eq!(strategy, ExtractionStrategy::JsonFence);
        assert_eq!(candidate, "{\"recipe_name\": \"Soup\"}");
    }

    #[test]
    fn test_plain_fence_used_without_json_tag() {
        let text = "Here you go:\n```\n{\"recipe_name\": \"Stew\"}\n```\nEnjoy";
        let (strategy, candidate) = extract_json_candidate(text);
        assert_eq!(strategy, ExtractionStrategy::AnyFence);
        assert_eq!(candidate, "{\"recipe_name\": \"Stew\"}");
    }

    #[test]
    fn test_whole_text_used_without_fences() {
        let text = "   {\"recipe_name\": \"Toast\"}  \n";
        let (strategy, candidate) = extract_json_candidate(text);
        assert_eq!(strategy, ExtractionStrategy::WholeText);
        assert_eq!(candidate, "{\"recipe_name\": \"Toast\"}");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let (strategy, candidate) = extract_json_candidate("```json\n{\"a\": 1}");
        assert_eq!(strategy, ExtractionStrategy::JsonFence);
        assert_eq!(candidate, "{\"a\": 1}");
    }

    #[test]
    fn test_structured_fields() {
        let raw = r#"```json
{
  "recipe_name": "Tomato Soup",
  "ingredients": ["4 tomatoes", "1 onion"],
  "method": ["Chop", "Simmer"],
  "serving_size": 4,
  "additional_notes": "Serve hot",
  "cuisine": "Italian"
}
```"#;
        let record = structure_response(raw);
        assert_eq!(record.recipe_name, "Tomato Soup");
        assert_eq!(record.ingredients, vec![json!("4 tomatoes"), json!("1 onion")]);
        assert_eq!(record.method.len(), 2);
        assert_eq!(record.serving_size, "4");
        assert_eq!(record.additional_notes, "Serve hot");
        assert_eq!(record.extra.get("cuisine"), Some(&json!("Italian")));
        assert!(!record.is_parse_error());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let record = structure_response("{\"recipe_name\": \"Rice\", \"method\": \"Boil it\"}");
        assert_eq!(record.recipe_name, "Rice");
        assert!(record.ingredients.is_empty());
        assert_eq!(record.method, vec![json!("Boil it")]);
        assert_eq!(record.serving_size, "");
    }

    #[test]
    fn test_invalid_json_yields_sentinel() {
        let raw = "I could not find a recipe in this video.";
        let record = structure_response(raw);
        assert_eq!(record.recipe_name, "Parse Error");
        assert!(record.ingredients.is_empty());
        assert!(record.method.is_empty());
        assert_eq!(record.serving_size, "Unknown");
        assert!(record.additional_notes.starts_with("Failed to parse JSON: "));
        assert!(record
            .additional_notes
            .ends_with(". Raw response: I could not find a recipe in this video...."));
        assert!(record.is_parse_error());
    }

    #[test]
    fn test_sentinel_truncates_raw_text() {
        let raw = format!("```json\n{}", "é".repeat(500));
        let record = structure_response(&raw);
        assert!(record.is_parse_error());
        let preview = record
            .additional_notes
            .split("Raw response: ")
            .nth(1)
            .unwrap();
        assert_eq!(preview.chars().count(), RAW_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_non_object_json_yields_sentinel() {
        let record = structure_response("[1, 2, 3]");
        assert!(record.is_parse_error());
        assert!(record.additional_notes.contains("expected a JSON object, found an array"));
    }

    #[test]
    fn test_provenance_serialized_only_when_set() {
        let mut record = structure_response("{\"recipe_name\": \"Soup\"}");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("video_file").is_none());

        record.video_file = Some("soup.mp4".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video_file"], "soup.mp4");
    }
}
