use anyhow::{Context, Result};
use std::path::Path;

/// 批量模式默认提示词
pub const BATCH_PROMPT: &str = "Watch the video and extract the exact recipe being made. \
Return the recipe name, a list of ingredients with quantities, the step-by-step method, serving size, and any other relevant details. \
Format the response as structured JSON with keys: 'recipe_name', 'ingredients', 'method', 'serving_size', and 'additional_notes'.";

/// HTTP 接口默认提示词：要求模型估算视频中未给出的用量
pub const SERVER_PROMPT: &str = "Watch the video and extract the exact recipe being made. \
Return the recipe name, a list of ingredients with quantities, the step-by-step method, serving size, and any other relevant details. \
IMPORTANT: If you cannot determine exact quantities from the video, provide reasonable estimates based on typical recipe proportions and cooking practices. \
For example: \
- If you see 'add some oil' but can't see the exact amount, estimate '2 tablespoons oil' \
- If you see 'season with salt' but no specific amount, estimate '1/2 teaspoon salt' \
- If you see 'add a pinch of spice' but can't see the amount, estimate '1/4 teaspoon' \
- If serving size is not clear, estimate based on the ingredients and cooking method shown \
- For ingredients like 'garlic' without quantity, estimate '2-3 cloves' or '1 tablespoon minced' \
- For 'to taste' ingredients, provide a starting amount like '1/4 teaspoon' \
Do NOT use 'No quantity specified' or 'Not specified' - always provide reasonable estimates. \
Format the response as structured JSON with keys: 'recipe_name', 'ingredients', 'method', 'serving_size', and 'additional_notes'.";

/// 读取提示词文件；未配置时返回默认值
pub fn load_prompt(path: Option<&Path>, default: &str) -> Result<String> {
    let Some(path) = path else {
        return Ok(default.to_string());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取提示词文件失败: {}", path.display()))?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("提示词文件为空: {}", path.display());
    }
    Ok(text.to_string())
}
