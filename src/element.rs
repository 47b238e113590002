use crate::datatypes::{CharCursor, NodeFlags};
use crate::utils::{is_raw_text_tag, is_void_tag};

/// 节点子元素
#[derive(Debug, Clone)]
pub enum NodeChild {
    /// 子元素
    Element(Box<Element>),
    /// 可见文本
    Text(String),
    /// 原样保留的标记（注释、DOCTYPE、游离的闭合标签等，不计入可见文本）
    Raw(String),
}

/// 元素结构
///
/// 开始/闭合标签的原始文本逐字节保留，保证未修改的节点
/// 在 解析 -> 序列化 往返后与输入完全一致。
#[derive(Debug, Clone)]
pub struct Element {
    /// 标签名（小写，用于比较）
    pub tag_name: String,
    /// 原始开始标签文本
    pub raw_open_tag: String,
    /// 原始闭合标签文本（空元素或未闭合时为None）
    pub raw_close_tag: Option<String>,
    /// 标志位
    pub flags: NodeFlags,
    /// 子节点列表
    pub children: Vec<NodeChild>,
}

impl Element {
    /// 创建合成根节点（序列化时只输出子节点）
    pub(crate) fn synthetic_root(children: Vec<NodeChild>) -> Self {
        Element {
            tag_name: "#document".to_string(),
            raw_open_tag: String::new(),
            raw_close_tag: None,
            flags: NodeFlags::SYNTHETIC,
            children,
        }
    }

    /// 解析一个元素（游标必须位于 `<` 且后随字母）
    fn parse(cursor: &mut CharCursor) -> Self {
        let start = cursor.position();
        cursor.bump(); // '<'

        let name_start = cursor.position();
        while matches!(cursor.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == ':') {
            cursor.bump();
        }
        let tag_name = cursor.slice_from(name_start).to_ascii_lowercase();

        // 扫描到开始标签结束的 '>'，属性值内的 '>' 不算
        let mut quote: Option<char> = None;
        while let Some(c) = cursor.bump() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == '>' => break,
                None => {}
            }
        }
        let raw_open_tag = cursor.slice_from(start).to_string();

        let mut flags = NodeFlags::empty();
        let before_gt = raw_open_tag.trim_end_matches('>').trim_end();
        if before_gt.ends_with('/') {
            flags.insert(NodeFlags::SELF_CLOSING);
        }
        if is_void_tag(&tag_name) {
            flags.insert(NodeFlags::VOID);
        }
        if is_raw_text_tag(&tag_name) {
            flags.insert(NodeFlags::RAW_TEXT);
        }

        if flags.intersects(NodeFlags::VOID | NodeFlags::SELF_CLOSING) {
            return Element {
                tag_name,
                raw_open_tag,
                raw_close_tag: None,
                flags,
                children: Vec::new(),
            };
        }

        if flags.contains(NodeFlags::RAW_TEXT) {
            // script/style：内容原样吞到对应闭合标签为止
            let rest = cursor.rest();
            let (children, raw_close_tag) = match find_raw_close(rest, &tag_name) {
                Some((content_end, close_end)) => {
                    let content = rest[..content_end].to_string();
                    let close = rest[content_end..close_end].to_string();
                    cursor.advance(close_end);
                    let children = if content.is_empty() {
                        Vec::new()
                    } else {
                        vec![NodeChild::Text(content)]
                    };
                    (children, Some(close))
                }
                None => {
                    // 未闭合：余下全部作为内容
                    let content = rest.to_string();
                    cursor.advance(rest.len());
                    let children = if content.is_empty() {
                        Vec::new()
                    } else {
                        vec![NodeChild::Text(content)]
                    };
                    (children, None)
                }
            };
            return Element {
                tag_name,
                raw_open_tag,
                raw_close_tag,
                flags,
                children,
            };
        }

        let children = parse_nodes(cursor, Some(tag_name.as_str()));

        // 匹配的闭合标签由当前元素消耗
        let mut raw_close_tag = None;
        if cursor.starts_with("</") {
            if let Some(name) = peek_close_name(cursor.rest()) {
                if name == tag_name {
                    let close_start = cursor.position();
                    while let Some(c) = cursor.bump() {
                        if c == '>' {
                            break;
                        }
                    }
                    raw_close_tag = Some(cursor.slice_from(close_start).to_string());
                }
            }
        }

        Element {
            tag_name,
            raw_open_tag,
            raw_close_tag,
            flags,
            children,
        }
    }

    /// 聚合自身与所有后代的可见文本
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.flags.contains(NodeFlags::RAW_TEXT) {
            return;
        }
        for child in &self.children {
            match child {
                NodeChild::Element(el) => el.collect_text(out),
                NodeChild::Text(t) => out.push_str(t),
                NodeChild::Raw(_) => {}
            }
        }
    }

    /// 序列化自身（含标签）
    pub fn write_markup(&self, out: &mut String) {
        if !self.flags.contains(NodeFlags::SYNTHETIC) {
            out.push_str(&self.raw_open_tag);
        }
        for child in &self.children {
            match child {
                NodeChild::Element(el) => el.write_markup(out),
                NodeChild::Text(t) | NodeChild::Raw(t) => out.push_str(t),
            }
        }
        if let Some(close) = &self.raw_close_tag {
            out.push_str(close);
        }
    }

    /// 序列化内部标记（不含自身标签）
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                NodeChild::Element(el) => el.write_markup(&mut out),
                NodeChild::Text(t) | NodeChild::Raw(t) => out.push_str(t),
            }
        }
        out
    }

    /// 以新的标记文本替换全部子节点
    pub fn set_inner_markup(&mut self, markup: &str) {
        self.children = parse_fragment(markup);
        self.flags.insert(NodeFlags::MODIFIED);
    }

    /// 按子节点索引路径解析元素
    pub fn resolve_path(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            match current.children.get(index)? {
                NodeChild::Element(el) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// 按子节点索引路径解析元素（可变引用）
    pub fn resolve_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            match current.children.get_mut(index)? {
                NodeChild::Element(el) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// 统计后代元素数量（不含自身）
    pub fn count_descendant_elements(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                NodeChild::Element(el) => 1 + el.count_descendant_elements(),
                _ => 0,
            })
            .sum()
    }

    /// 统计文本节点数量
    pub fn count_text_runs(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                NodeChild::Element(el) => el.count_text_runs(),
                NodeChild::Text(_) => 1,
                NodeChild::Raw(_) => 0,
            })
            .sum()
    }

    /// 是否被标记为已修改
    pub fn is_modified(&self) -> bool {
        self.flags.contains(NodeFlags::MODIFIED)
    }
}

/// 解析标记片段为节点列表
pub fn parse_fragment(source: &str) -> Vec<NodeChild> {
    let mut cursor = CharCursor::new(source);
    parse_nodes(&mut cursor, None)
}

/// 解析节点序列，遇到与 `enclosing` 匹配的闭合标签时停止（由调用方消耗）
fn parse_nodes(cursor: &mut CharCursor, enclosing: Option<&str>) -> Vec<NodeChild> {
    let mut children = Vec::new();

    while !cursor.at_end() {
        if cursor.starts_with("</") {
            let name = peek_close_name(cursor.rest());
            if let (Some(name), Some(enclosing)) = (name.as_deref(), enclosing) {
                if name == enclosing {
                    break;
                }
            }
            // 游离的闭合标签：原样保留
            children.push(NodeChild::Raw(consume_through(cursor, ">")));
        } else if cursor.starts_with("<!--") {
            children.push(NodeChild::Raw(consume_through(cursor, "-->")));
        } else if cursor.starts_with("<!") || cursor.starts_with("<?") {
            children.push(NodeChild::Raw(consume_through(cursor, ">")));
        } else if is_tag_start(cursor) {
            children.push(NodeChild::Element(Box::new(Element::parse(cursor))));
        } else {
            // 文本：至少消耗一个字符，切到下一个 '<'
            let start = cursor.position();
            cursor.bump();
            while matches!(cursor.peek(), Some(c) if c != '<') {
                cursor.bump();
            }
            children.push(NodeChild::Text(cursor.slice_from(start).to_string()));
        }
    }

    children
}

/// 游标是否位于元素开始标签（`<` 后随字母）
fn is_tag_start(cursor: &CharCursor) -> bool {
    let rest = cursor.rest();
    let mut chars = rest.chars();
    chars.next() == Some('<') && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
}

/// 消耗到指定结束串（含结束串本身），未找到则消耗剩余全部
fn consume_through(cursor: &mut CharCursor, terminator: &str) -> String {
    let start = cursor.position();
    match cursor.find(terminator) {
        Some(pos) => {
            let end = pos + terminator.len() - cursor.position();
            cursor.advance(end);
        }
        None => {
            let rest_len = cursor.rest().len();
            cursor.advance(rest_len);
        }
    }
    cursor.slice_from(start).to_string()
}

/// 读取闭合标签的标签名（输入以 `</` 开头），不前进游标
fn peek_close_name(rest: &str) -> Option<String> {
    let after = rest.strip_prefix("</")?;
    let name: String = after
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

/// 在原始文本元素内容中查找对应的闭合标签
///
/// 返回 (内容结束偏移, 闭合标签结束偏移)
fn find_raw_close(rest: &str, name: &str) -> Option<(usize, usize)> {
    let mut search = 0;
    while let Some(idx) = rest[search..].find("</").map(|i| search + i) {
        let after = &rest.as_bytes()[idx + 2..];
        if after.len() >= name.len() && after[..name.len()].eq_ignore_ascii_case(name.as_bytes()) {
            let following = rest[idx + 2 + name.len()..].chars().next();
            if matches!(following, None | Some('>') | Some('/')) || matches!(following, Some(c) if c.is_ascii_whitespace()) {
                let close_end = match rest[idx..].find('>') {
                    Some(i) => idx + i + 1,
                    None => rest.len(),
                };
                return Some((idx, close_end));
            }
        }
        search = idx + 2;
    }
    None
}
