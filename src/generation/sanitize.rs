//! 响应清洗：从带装饰的模型输出中提取 JSON 对象文本
//!
//! 模型输出常被 markdown 代码块或前后说明文字包裹；这里只做结构提取，不做解析，
//! 使得之后的解析失败可以归因于内容本身而非装饰。

use std::sync::OnceLock;

use regex::Regex;

/// 兜底返回值：空对象
pub const EMPTY_OBJECT: &str = "{}";

static FENCE_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap())
}

/// 第一个 `{` 到最后一个 `}` 的区间（含两端）
fn brace_span(text: &str) -> Option<(usize, usize)> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => Some((start, end)),
        _ => None,
    }
}

/// 提取 JSON 对象文本
///
/// 1. 空输入返回 `{}`
/// 2. 若有 ``` 代码块（可带 json 标记）且它不在外层对象内部，取其内部文本；
///    文件内容里的代码块（如 README 中的 ```bash）位于对象内部，不作为包裹处理
/// 3. 取第一个 `{` 到最后一个 `}`（含）；代码块内找不到时退回整段文本
/// 4. 找不到合法区间时返回 `{}`：解析得到不含 files 的对象，必需步骤随后以 EmptyResult 失败
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return EMPTY_OBJECT.to_string();
    }

    let outer = brace_span(raw);
    let fenced = fence_re().captures(raw).and_then(|c| {
        let whole = c.get(0)?;
        let inner = c.get(1)?;
        match outer {
            Some((start, end)) if start < whole.start() && end >= whole.end() => None,
            _ => Some(inner.as_str()),
        }
    });

    let span = fenced
        .and_then(|text| brace_span(text).map(|(start, end)| &text[start..=end]))
        .or_else(|| outer.map(|(start, end)| &raw[start..=end]));

    span.unwrap_or(EMPTY_OBJECT).to_string()
}
