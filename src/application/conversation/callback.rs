//! Callback Tokens - 内联按钮回调数据
//!
//! 格式: `<verb>:<index>`，verb ∈ {search, sub, unsub}

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackVerb {
    /// 选择搜索结果
    Search,
    /// 确认订阅
    Subscribe,
    /// 退订
    Unsubscribe,
}

impl CallbackVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackVerb::Search => "search",
            CallbackVerb::Subscribe => "sub",
            CallbackVerb::Unsubscribe => "unsub",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackToken {
    pub verb: CallbackVerb,
    pub index: usize,
}

impl CallbackToken {
    pub fn new(verb: CallbackVerb, index: usize) -> Self {
        Self { verb, index }
    }

    pub fn search(index: usize) -> Self {
        Self::new(CallbackVerb::Search, index)
    }

    pub fn subscribe(index: usize) -> Self {
        Self::new(CallbackVerb::Subscribe, index)
    }

    pub fn unsubscribe(index: usize) -> Self {
        Self::new(CallbackVerb::Unsubscribe, index)
    }
}

impl std::fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.verb.as_str(), self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCallbackToken(pub String);

impl FromStr for CallbackToken {
    type Err = InvalidCallbackToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCallbackToken(s.to_string());
        let (verb, index) = s.split_once(':').ok_or_else(invalid)?;
        let verb = match verb {
            "search" => CallbackVerb::Search,
            "sub" => CallbackVerb::Subscribe,
            "unsub" => CallbackVerb::Unsubscribe,
            _ => return Err(invalid()),
        };
        let index = index.parse::<usize>().map_err(|_| invalid())?;
        Ok(Self { verb, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("search:3".parse::<CallbackToken>(), Ok(CallbackToken::search(3)));
        assert_eq!("sub:0".parse::<CallbackToken>(), Ok(CallbackToken::subscribe(0)));
        assert_eq!("unsub:12".parse::<CallbackToken>(), Ok(CallbackToken::unsubscribe(12)));
    }

    #[test]
    fn test_reject_malformed_tokens() {
        for bad in ["search", "search:", "search:-1", "play:1", ":1", "sub:x", ""] {
            assert!(bad.parse::<CallbackToken>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(CallbackToken::unsubscribe(4).to_string(), "unsub:4");
    }
}
