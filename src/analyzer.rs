use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::ConfigError;

/// A character filter receives the whole text and can transform it by adding,
/// removing, or changing characters. Markup stripping and punctuation removal
/// both live here, before the text is split into tokens.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Extracts the visible text of an HTML document.
///
/// Text nodes are joined with single spaces and runs of whitespace collapsed,
/// so the output is one line. Anything inside `script`, `style`, `noscript`
/// or `template` is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTextFilter;

impl HtmlTextFilter {
    pub fn get_dom(html: &str) -> RcDom {
        parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut std::io::Cursor::new(html))
            .unwrap_or_default()
    }

    fn is_hidden(local: &str) -> bool {
        matches!(local, "script" | "style" | "noscript" | "template")
    }

    pub fn walk_html(handle: &Handle, out: &mut String) {
        match &handle.data {
            NodeData::Text { contents } => {
                let s = contents.borrow();
                for word in s.split_whitespace() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(word);
                }
            }
            NodeData::Element { name, .. } => {
                if Self::is_hidden(&name.local) {
                    return;
                }
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
            }
            NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
            _ => {
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
            }
        }
    }
}

impl CharacterFilter for HtmlTextFilter {
    fn filter(&self, html: String) -> String {
        let dom = Self::get_dom(&html);
        let mut out = String::new();
        Self::walk_html(&dom.document, &mut out);
        out
    }
}

/// Removes punctuation characters outright, so `ИТМО,` becomes `ИТМО` and
/// `e-mail` becomes `email`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PunctuationFilter;

impl PunctuationFilter {
    fn is_punctuation(c: char) -> bool {
        c.is_ascii_punctuation() || matches!(c, '«' | '»' | '—' | '–' | '…' | '“' | '”' | '„')
    }
}

impl CharacterFilter for PunctuationFilter {
    fn filter(&self, text: String) -> String {
        text.chars().filter(|c| !Self::is_punctuation(*c)).collect()
    }
}

/// A tokenizer receives a stream of characters and breaks it up into
/// individual tokens (usually words).
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace().map(|w| w.to_string()).collect()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<String>) -> Vec<String>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().map(|t| t.to_lowercase()).collect()
    }
}

/// Natural language whose stop words are removed from page text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StopWordLanguage {
    English,
    #[default]
    Russian,
    German,
    French,
    Spanish,
    /// Keep every token.
    None,
}

impl StopWordLanguage {
    pub fn words(self) -> HashSet<String> {
        let language = match self {
            Self::English => stop_words::LANGUAGE::English,
            Self::Russian => stop_words::LANGUAGE::Russian,
            Self::German => stop_words::LANGUAGE::German,
            Self::French => stop_words::LANGUAGE::French,
            Self::Spanish => stop_words::LANGUAGE::Spanish,
            Self::None => return HashSet::new(),
        };
        stop_words::get(language)
            .into_iter()
            .map(|w| w.to_string())
            .collect()
    }
}

impl FromStr for StopWordLanguage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "russian" | "ru" => Ok(Self::Russian),
            "german" | "de" => Ok(Self::German),
            "french" | "fr" => Ok(Self::French),
            "spanish" | "es" => Ok(Self::Spanish),
            "none" | "" => Ok(Self::None),
            other => Err(ConfigError::Invalid {
                key: "STOP_WORDS_LANGUAGE",
                value: other.to_string(),
                reason: "unsupported language".to_string(),
            }),
        }
    }
}

impl fmt::Display for StopWordLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::English => "english",
            Self::Russian => "russian",
            Self::German => "german",
            Self::French => "french",
            Self::Spanish => "spanish",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

pub struct StopWordTokenFilter {
    stop_words: HashSet<String>,
}

impl StopWordTokenFilter {
    pub fn new(language: StopWordLanguage) -> Self {
        Self {
            stop_words: language.words(),
        }
    }
}

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        tokens.retain(|t| !self.stop_words.contains(t));
        tokens
    }
}

/// Pure text cleaning pipeline: character filters, then a tokenizer, then
/// token filters, rejoined with single spaces. No I/O.
pub struct TextCleaner {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

impl TextCleaner {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// Lowercase, drop punctuation, split on whitespace, remove stop words.
    pub fn for_language(language: StopWordLanguage) -> Self {
        Self::new(
            vec![Box::new(PunctuationFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(LowerCaseTokenFilter),
                Box::new(StopWordTokenFilter::new(language)),
            ],
        )
    }

    /// Same as [`TextCleaner::for_language`] but strips HTML markup first.
    pub fn for_html(language: StopWordLanguage) -> Self {
        Self::new(
            vec![Box::new(HtmlTextFilter), Box::new(PunctuationFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(LowerCaseTokenFilter),
                Box::new(StopWordTokenFilter::new(language)),
            ],
        )
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn token_filter(&self, mut tokens: Vec<String>) -> Vec<String> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    pub fn tokens(&self, raw: &str) -> Vec<String> {
        let content = self.char_filter(raw.to_string());
        let tokens = self.tokenizer.tokenize(content);
        self.token_filter(tokens)
    }

    pub fn clean(&self, raw: &str) -> String {
        self.tokens(raw).join(" ")
    }
}
