use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;
use crate::sentiment::tag::dict;

/// 标题经过标签解析后的符号候选与情绪动词
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTags {
    pub stock_symbols: Vec<String>,
    pub crypto_symbols: Vec<String>,
    pub other_symbols: Vec<String>,
    pub verbs: Vec<String>,
}

/// 抽象：标题 -> 符号候选。日度抽取只依赖这个接口，测试可注入假实现
#[async_trait]
pub trait TagResolver: Send + Sync {
    async fn resolve(&self, title: &str) -> Result<ResolvedTags, AppError>;
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$?[A-Za-z][A-Za-z0-9]*").unwrap());

/// 具体实现：内嵌字典 + 正则分词
///
/// 规则与原始标签服务一致：
/// - token 命中股票字典 -> stock
/// - token 命中加密货币集合 -> crypto
/// - `$` 前缀但两个字典都未命中的 1~5 位大写 token -> other
/// - 小写命中情绪动词集合 -> verbs
pub struct DictTagResolver;

impl DictTagResolver {
    pub fn new() -> Self {
        Self
    }

    fn push_unique(list: &mut Vec<String>, value: String) {
        if !list.contains(&value) {
            list.push(value);
        }
    }
}

impl Default for DictTagResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagResolver for DictTagResolver {
    async fn resolve(&self, title: &str) -> Result<ResolvedTags, AppError> {
        let mut tags = ResolvedTags::default();

        for token in TOKEN_RE.find_iter(title) {
            let raw = token.as_str();
            let dollar_tagged = raw.starts_with('$');
            let word = raw.trim_start_matches('$');
            let upper = word.to_uppercase();
            let lower = word.to_lowercase();

            if dict::VERB_SET.contains(lower.as_str()) {
                Self::push_unique(&mut tags.verbs, lower);
                continue;
            }

            // 全小写的普通词不当作符号候选，避免把日常用语识别成 ticker
            let ticker_like = dollar_tagged || word.chars().all(|c| c.is_ascii_uppercase());

            if dict::STOCK_DICT.contains_key(upper.as_str()) {
                if ticker_like {
                    Self::push_unique(&mut tags.stock_symbols, upper);
                }
            } else if dict::CRYPTO_SET.contains(upper.as_str()) {
                if ticker_like {
                    Self::push_unique(&mut tags.crypto_symbols, upper);
                }
            } else if dollar_tagged && (1..=5).contains(&upper.len()) {
                Self::push_unique(&mut tags.other_symbols, upper);
            }
        }

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_categories() -> anyhow::Result<()> {
        let resolver = DictTagResolver::new();
        let tags = resolver
            .resolve("YOLO buy GME and $BTC before the squeeze, also $XYZ")
            .await?;

        assert_eq!(tags.stock_symbols, vec!["GME"]);
        assert_eq!(tags.crypto_symbols, vec!["BTC"]);
        assert_eq!(tags.other_symbols, vec!["XYZ"]);
        assert_eq!(tags.verbs, vec!["yolo", "buy", "squeeze"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_lowercase_words_are_not_tickers() -> anyhow::Result<()> {
        let resolver = DictTagResolver::new();
        // "f" 和 "t" 都是真实 ticker，但小写普通词不应命中
        let tags = resolver.resolve("waiting for the dip").await?;
        assert!(tags.stock_symbols.is_empty());
        assert_eq!(tags.verbs, vec!["dip"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_tokens_resolved_once() -> anyhow::Result<()> {
        let resolver = DictTagResolver::new();
        let tags = resolver.resolve("GME GME GME to the moon").await?;
        assert_eq!(tags.stock_symbols, vec!["GME"]);
        assert_eq!(tags.verbs, vec!["moon"]);
        Ok(())
    }
}
