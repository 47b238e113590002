use serde::{Deserialize, Serialize};

/// 提取的金额记录
///
/// 此结构用于文档的金额提取和应用：
/// - 提取时：`value` 为文档中解析出的原始数值
/// - 应用时：`value` 为要写回文档的新数值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedAmount {
    /// 节点路径（从根到元素的子节点索引，斜杠分隔）
    pub node_path: String,
    /// 元素标签名
    pub tag_name: String,
    /// 标记符在节点内的出现顺序索引（从 0 开始）
    /// 即使节点内只有一个金额也带索引
    pub index: i32,
    /// 金额数值
    /// - 提取时：文档中的原始数值
    /// - 应用时：要写回的新数值
    pub value: f64,
    /// 标准格式化表示（千位分组 + 两位小数）
    pub formatted: String,
}

impl ExtractedAmount {
    /// 创建新的金额记录
    pub fn new(
        node_path: String,
        tag_name: String,
        index: i32,
        value: f64,
        formatted: String,
    ) -> Self {
        ExtractedAmount {
            node_path,
            tag_name,
            index,
            value,
            formatted,
        }
    }

    /// 生成唯一标识符用于匹配
    ///
    /// 格式：{node_path}|{tag_name}|{index}
    pub fn get_unique_key(&self) -> String {
        format!("{}|{}|{}", self.node_path, self.tag_name, self.index)
    }

    /// 要写回的数值
    pub fn get_value_to_apply(&self) -> f64 {
        self.value
    }
}

/// 把路径索引序列编码为路径字符串
pub fn encode_path(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_key() {
        let amount = ExtractedAmount::new("0/3/1".to_string(), "span".to_string(), 2, 9.99, "9.99".to_string());
        assert_eq!(amount.get_unique_key(), "0/3/1|span|2");
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path(&[0, 3, 1]), "0/3/1");
        assert_eq!(encode_path(&[]), "");
        assert_eq!(encode_path(&[7]), "7");
    }

    #[test]
    fn test_json_roundtrip() {
        let amount = ExtractedAmount::new("1".to_string(), "p".to_string(), 0, 1234.5, "1,234.50".to_string());
        let json = serde_json::to_string(&amount).unwrap();
        let back: ExtractedAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get_unique_key(), amount.get_unique_key());
        assert_eq!(back.value, 1234.5);
    }
}
