//! HTML资产提取器
//! 单趟扫描HTML标记流，收集script-src与meta标签，产出可直接并入证据的资产集

use std::cell::RefCell;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::interface::Attribute;
use rustc_hash::FxHashMap;
use tendril::StrTendril;

/// 单次提取得到的页面资产
/// `meta` 的键已小写，同名标签保留全部内容，可直接作为证据的meta映射
#[derive(Debug, Default, Clone)]
pub struct PageAssets {
    pub script_srcs: Vec<String>,
    pub meta: FxHashMap<String, Vec<String>>,
}

/// 标记流收集器
#[derive(Default)]
struct AssetSink {
    assets: RefCell<PageAssets>,
}

impl TokenSink for AssetSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        let Token::TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if tag.kind != TagKind::StartTag {
            return TokenSinkResult::Continue;
        }

        let mut assets = self.assets.borrow_mut();
        match tag.name.as_ref() {
            "script" => {
                if let Some(src) = attr_value(&tag.attrs, "src") {
                    assets.script_srcs.push(src);
                }
            }
            "meta" => {
                // name优先，缺失时回退property
                let key = attr_value(&tag.attrs, "name")
                    .or_else(|| attr_value(&tag.attrs, "property"));
                if let (Some(key), Some(content)) = (key, attr_value(&tag.attrs, "content")) {
                    assets
                        .meta
                        .entry(key.to_lowercase())
                        .or_default()
                        .push(content);
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// 读取指定属性的取值
fn attr_value(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

/// HTML资产提取器
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// 扫描HTML字符串，返回提取到的页面资产
    pub fn extract(html: &str) -> PageAssets {
        let tokenizer = Tokenizer::new(AssetSink::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.assets.into_inner()
    }
}
