use encoding_rs;

/// 字符游标：在标记文本上按字节偏移前进
///
/// 所有偏移都是字节偏移，并且始终落在字符边界上。
#[derive(Debug)]
pub struct CharCursor<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> CharCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        CharCursor { source, position: 0 }
    }

    /// 当前字节位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 是否已到达末尾
    pub fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    /// 查看当前字符（不前进）
    pub fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    /// 读取当前字符并前进
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    /// 剩余文本
    pub fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    /// 剩余文本是否以指定前缀开头
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// 剩余文本是否以指定前缀开头（忽略ASCII大小写）
    pub fn starts_with_ignore_case(&self, prefix: &str) -> bool {
        let rest = self.rest();
        rest.len() >= prefix.len() && rest[..prefix.len()].eq_ignore_ascii_case(prefix)
    }

    /// 消耗指定数量的字节（必须落在字符边界上）
    pub fn advance(&mut self, bytes: usize) {
        debug_assert!(self.source.is_char_boundary(self.position + bytes));
        self.position += bytes;
    }

    /// 取出从起始位置到当前位置的切片
    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.position]
    }

    /// 在剩余文本中查找子串，返回绝对字节偏移
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.rest().find(needle).map(|i| self.position + i)
    }
}

/// 金额字符：数字、小数点、分组分隔符
pub fn is_amount_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ','
}

// 支持的编码
const SUPPORTED_ENCODINGS: &[&str] = &["utf-8", "windows-1252", "windows-1250", "windows-1251", "gbk"];

#[derive(Debug, Clone)]
pub struct RawString {
    pub content: String,
    pub encoding: String,
}

impl RawString {
    /// 尝试多种编码解码
    pub fn decode(data: &[u8]) -> Self {
        for encoding_name in SUPPORTED_ENCODINGS {
            if let Some(encoding) = encoding_rs::Encoding::for_label(encoding_name.as_bytes()) {
                let (decoded, _, had_errors) = encoding.decode(data);
                if !had_errors {
                    return RawString {
                        content: decoded.into_owned(),
                        encoding: encoding_name.to_string(),
                    };
                }
            }
        }

        // 回退到UTF-8，忽略错误
        RawString {
            content: String::from_utf8_lossy(data).into_owned(),
            encoding: "utf-8".to_string(),
        }
    }

    /// 使用指定编码解码
    pub fn decode_with(data: &[u8], label: &str) -> Option<Self> {
        let encoding = encoding_rs::Encoding::for_label(label.as_bytes())?;
        let (decoded, _, _) = encoding.decode(data);
        Some(RawString {
            content: decoded.into_owned(),
            encoding: label.to_string(),
        })
    }

    /// 使用指定编码重新编码
    pub fn encode(text: &str, label: &str) -> Vec<u8> {
        match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => encoding.encode(text).0.into_owned(),
            None => text.as_bytes().to_vec(),
        }
    }
}

// 节点标志位定义
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        const VOID = 0x00000001;          // 空元素（br/img等，无闭合标签）
        const SELF_CLOSING = 0x00000002;  // 以 /> 结尾的自闭合标签
        const RAW_TEXT = 0x00000004;      // 原始文本元素（script/style），内容不计入可见文本
        const MODIFIED = 0x00000008;      // 内部标记已被改写
        const SYNTHETIC = 0x00000010;     // 合成根节点（序列化时不输出自身标签）
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_basic() {
        let mut cursor = CharCursor::new("a<b>");
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.bump(), Some('a'));
        assert!(cursor.starts_with("<b>"));
        assert_eq!(cursor.find(">"), Some(3));
        cursor.advance(3);
        assert!(cursor.at_end());
    }

    #[test]
    fn test_cursor_multibyte() {
        let mut cursor = CharCursor::new("价格$5");
        assert_eq!(cursor.bump(), Some('价'));
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.bump(), Some('格'));
        assert_eq!(cursor.peek(), Some('$'));
    }

    #[test]
    fn test_decode_utf8() {
        let raw = RawString::decode("¥100 与 $200".as_bytes());
        assert_eq!(raw.encoding, "utf-8");
        assert!(raw.content.contains("$200"));
    }

    #[test]
    fn test_encode_roundtrip() {
        let bytes = RawString::encode("<p>$9.99</p>", "windows-1252");
        let raw = RawString::decode_with(&bytes, "windows-1252").unwrap();
        assert_eq!(raw.content, "<p>$9.99</p>");
    }

    #[test]
    fn test_amount_char() {
        assert!(is_amount_char('0'));
        assert!(is_amount_char('.'));
        assert!(is_amount_char(','));
        assert!(!is_amount_char('$'));
        assert!(!is_amount_char(' '));
    }
}
