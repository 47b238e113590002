use crate::adjust::{format_amount, round2, AdjustmentSpec};
use crate::amount::{encode_path, ExtractedAmount};
use crate::datatypes::RawString;
use crate::element::{parse_fragment, Element};
use crate::extract;
use crate::locate::{self, Candidate};
use crate::rewrite;
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 标记文档
#[derive(Debug)]
pub struct Document {
    /// 文件路径（内存文档为None）
    pub path: Option<PathBuf>,
    /// 合成根节点，持有全部顶层节点
    pub root: Element,
    /// 源编码（写回时沿用）
    pub encoding: String,
}

/// 节点内的改写计划
enum RewritePlan<'a> {
    /// 统一调整：每个金额应用同一个调整规格
    Uniform(&'a AdjustmentSpec),
    /// 按唯一键覆盖指定金额
    Overrides(&'a HashMap<String, f64>),
}

impl Document {
    /// 从内存中的标记文本构造文档
    pub fn parse(source: &str) -> Self {
        Document {
            path: None,
            root: Element::synthetic_root(parse_fragment(source)),
            encoding: "utf-8".to_string(),
        }
    }

    /// 加载文档文件
    ///
    /// 使用内存映射读取（零拷贝），按候选编码列表自动解码。
    ///
    /// # 示例
    /// ```rust,ignore
    /// let doc = Document::load("catalog.html".into())?;
    /// ```
    pub fn load(path: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_with_encoding(path, None)
    }

    /// 加载文档文件并指定源编码
    ///
    /// `encoding` 为 None 时依次尝试候选编码；指定编码标签无法识别时
    /// 返回错误。
    pub fn load_with_encoding(
        path: PathBuf,
        encoding: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let file = std::fs::File::open(&path)?;
        let raw = if file.metadata()?.len() == 0 {
            // 空文件无法建立内存映射
            RawString {
                content: String::new(),
                encoding: "utf-8".to_string(),
            }
        } else {
            // 使用内存映射文件（零拷贝访问文件数据）
            let mmap = unsafe { Mmap::map(&file)? };
            match encoding {
                Some(label) => RawString::decode_with(&mmap[..], label)
                    .ok_or_else(|| crate::utils::PriceError::EncodingError(label.to_string()))?,
                None => RawString::decode(&mmap[..]),
            }
        };

        #[cfg(debug_assertions)]
        println!("已加载文档: {:?} ({} 字节, 编码 {})", path, raw.content.len(), raw.encoding);

        Ok(Document {
            path: Some(path),
            root: Element::synthetic_root(parse_fragment(&raw.content)),
            encoding: raw.encoding,
        })
    }

    /// 序列化整个文档
    pub fn serialize(&self) -> String {
        self.root.inner_markup()
    }

    /// 写入文件（沿用源编码）
    pub fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let markup = self.serialize();
        let bytes = if self.encoding == "utf-8" {
            markup.into_bytes()
        } else {
            RawString::encode(&markup, &self.encoding)
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// 获取文档名称
    pub fn get_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("<内存文档>")
    }

    /// 对整个文档统一调整金额，返回改写的金额数量
    pub fn adjust_prices(&mut self, spec: &AdjustmentSpec, limit: Option<usize>) -> usize {
        adjust(spec, &mut self.root, limit)
    }

    /// 提取所有金额（并行版本）
    pub fn extract_amounts(&self) -> Vec<ExtractedAmount> {
        let candidates = locate::find(&self.root, None);
        candidates
            .par_iter()
            .flat_map(|candidate| self.extract_candidate_amounts(candidate))
            .collect()
    }

    /// 从单个候选节点提取金额记录
    fn extract_candidate_amounts(&self, candidate: &Candidate) -> Vec<ExtractedAmount> {
        let Some(element) = self.root.resolve_path(&candidate.path) else {
            debug_assert!(false, "候选路径必须可解析");
            return Vec::new();
        };

        let node_path = encode_path(&candidate.path);
        let markup = element.inner_markup();
        let mut amounts = Vec::new();

        for (index, &marker) in extract::find_markers(&markup).iter().enumerate() {
            let token = extract::capture(&markup, marker);
            if token.is_empty() || !token.value.is_finite() {
                continue;
            }
            amounts.push(ExtractedAmount::new(
                node_path.clone(),
                element.tag_name.clone(),
                index as i32,
                token.value,
                format_amount(round2(token.value)),
            ));
        }

        amounts
    }

    /// 按唯一键应用金额覆盖，返回应用数量
    ///
    /// 覆盖表来自 `extract_amounts` 的 JSON 导出：调用方修改其中的
    /// `value` 字段后整表传回，仅键匹配的金额被改写。
    pub fn apply_overrides(&mut self, overrides: Vec<ExtractedAmount>) -> usize {
        let override_map: HashMap<String, f64> = overrides
            .into_iter()
            .map(|a| (a.get_unique_key(), a.get_value_to_apply()))
            .collect();

        println!("开始应用金额覆盖，覆盖表中有 {} 个条目", override_map.len());

        #[cfg(debug_assertions)]
        {
            println!("覆盖表中的键值示例:");
            for (i, key) in override_map.keys().take(3).enumerate() {
                println!("  {}: {}", i + 1, key);
            }
        }

        let candidates = locate::find(&self.root, None);
        let mut applied = 0;

        // 与统一调整相同：倒序处理冻结的候选列表
        for candidate in candidates.iter().rev() {
            let node_path = encode_path(&candidate.path);
            let Some(element) = self.root.resolve_path_mut(&candidate.path) else {
                debug_assert!(false, "候选路径必须可解析");
                continue;
            };
            applied += process_markers(element, &node_path, &RewritePlan::Overrides(&override_map));
        }

        println!("成功应用了 {} 个金额覆盖", applied);
        if applied == 0 && !override_map.is_empty() {
            println!("⚠️ 警告：没有任何覆盖被应用，可能原因：");
            println!("  1. 覆盖文件中的键与文档结构不匹配");
            println!("  2. 文档在提取之后被修改过");
        }

        applied
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> DocumentStats {
        let candidates = locate::find(&self.root, None);

        DocumentStats {
            name: self.get_name().to_string(),
            encoding: self.encoding.clone(),
            element_count: self.root.count_descendant_elements(),
            text_run_count: self.root.count_text_runs(),
            candidate_count: candidates.len(),
            amount_count: candidates.iter().map(|c| c.occurrences).sum(),
        }
    }
}

/// 对子树统一调整金额
///
/// 先完整定位并冻结候选列表，再按文档顺序的倒序逐节点改写——
/// 对某个节点的改写不会影响任何未处理节点的位置有效性。
/// 返回改写的金额数量。
pub fn adjust(spec: &AdjustmentSpec, root: &mut Element, limit: Option<usize>) -> usize {
    let candidates = locate::find(root, limit);

    #[cfg(debug_assertions)]
    println!("定位到 {} 个候选节点", candidates.len());

    let mut adjusted = 0;
    for candidate in candidates.iter().rev() {
        let node_path = encode_path(&candidate.path);
        let Some(element) = root.resolve_path_mut(&candidate.path) else {
            debug_assert!(false, "候选路径必须可解析");
            continue;
        };
        adjusted += process_markers(element, &node_path, &RewritePlan::Uniform(spec));
    }

    adjusted
}

/// 处理单个节点内的全部标记符，返回改写数量
///
/// 节点内从右向左逐标记改写：右侧的改写不会移动左侧标记符及其
/// 偏移映射的位置。提取出非有限数值时放弃整个节点的改写，绝不
/// 输出部分拼接的标记文本。
fn process_markers(element: &mut Element, node_path: &str, plan: &RewritePlan) -> usize {
    let markup = element.inner_markup();
    let markers = extract::find_markers(&markup);
    if markers.is_empty() {
        return 0;
    }

    let mut patched = markup;
    let mut applied = 0;

    for (index, &marker) in markers.iter().enumerate().rev() {
        let token = extract::capture(&patched, marker);
        if token.is_empty() {
            // 标记符后没有数字，不是金额
            continue;
        }
        if !token.value.is_finite() {
            eprintln!(
                "警告: 节点 {} <{}> 的金额解析失败，放弃该节点的改写",
                node_path, element.tag_name
            );
            return 0;
        }

        let new_text = match plan {
            RewritePlan::Uniform(spec) => spec.apply_formatted(token.value),
            RewritePlan::Overrides(map) => {
                let key = format!("{}|{}|{}", node_path, element.tag_name, index);
                match map.get(&key) {
                    Some(&value) => format_amount(round2(value)),
                    None => continue,
                }
            }
        };

        patched = rewrite::splice(&patched, &token.offsets, &new_text);
        applied += 1;
    }

    if applied > 0 {
        element.set_inner_markup(&patched);
    }

    applied
}

/// 文档统计信息
pub struct DocumentStats {
    pub name: String,
    pub encoding: String,
    pub element_count: usize,
    pub text_run_count: usize,
    pub candidate_count: usize,
    pub amount_count: usize,
}

impl std::fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 文档统计信息 ===")?;
        writeln!(f, "名称: {}", self.name)?;
        writeln!(f, "编码: {}", self.encoding)?;
        writeln!(f, "元素数量: {}", self.element_count)?;
        writeln!(f, "文本节点数量: {}", self.text_run_count)?;
        writeln!(f, "候选节点数量: {}", self.candidate_count)?;
        writeln!(f, "金额数量: {}", self.amount_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delta_roundtrip() {
        let mut doc = Document::parse("<p>pay $1,234.56 now</p>");
        let adjusted = doc.adjust_prices(&AdjustmentSpec::additive(0.0), None);
        assert_eq!(adjusted, 1);
        assert_eq!(doc.serialize(), "<p>pay $1,234.56 now</p>", "零增量不应改变数字文本");
    }

    #[test]
    fn test_additive_adjustment() {
        let mut doc = Document::parse("<p>$10.00</p>");
        doc.adjust_prices(&AdjustmentSpec::additive(-2.46), None);
        assert_eq!(doc.serialize(), "<p>$7.54</p>");
    }

    #[test]
    fn test_percentage_adjustment() {
        let mut doc = Document::parse("<p>$100.00</p>");
        doc.adjust_prices(&AdjustmentSpec::percentage(-14.0), None);
        assert_eq!(doc.serialize(), "<p>$86.00</p>");
    }

    #[test]
    fn test_tag_interrupted_amount() {
        let mut doc = Document::parse("<p>$1<b>2</b>3.00</p>");
        doc.adjust_prices(&AdjustmentSpec::additive(1.0), None);
        assert_eq!(doc.serialize(), "<p>$1<b>2</b>4.00</p>");
    }

    #[test]
    fn test_growing_and_shrinking_splice() {
        let mut doc = Document::parse("<p>$9.99</p>");
        doc.adjust_prices(&AdjustmentSpec::additive(0.02), None);
        assert_eq!(doc.serialize(), "<p>$10.01</p>");

        let mut doc = Document::parse("<p>a $100.00 b</p>");
        doc.adjust_prices(&AdjustmentSpec::additive(-90.0), None);
        assert_eq!(doc.serialize(), "<p>a $10.00 b</p>");
    }

    #[test]
    fn test_multiple_amounts_right_to_left() {
        let mut doc = Document::parse("<p>$9.99 or $1,000.00</p>");
        doc.adjust_prices(&AdjustmentSpec::additive(0.02), None);
        assert_eq!(doc.serialize(), "<p>$10.01 or $1,000.02</p>");
    }

    #[test]
    fn test_limit_enforced() {
        let mut doc = Document::parse("<p>$1.00</p><p>$2.00</p><p>$3.00</p>");
        let adjusted = doc.adjust_prices(&AdjustmentSpec::additive(1.0), Some(2));
        assert_eq!(adjusted, 2);
        assert_eq!(doc.serialize(), "<p>$2.00</p><p>$3.00</p><p>$3.00</p>");
    }

    #[test]
    fn test_overlap_resolution_mutates_child_only() {
        let mut doc = Document::parse("<div>Total: <span>$5.00</span></div>");
        doc.adjust_prices(&AdjustmentSpec::additive(1.0), None);
        assert_eq!(doc.serialize(), "<div>Total: <span>$6.00</span></div>");
    }

    #[test]
    fn test_skip_subtree_mutates_parent_once() {
        let mut doc = Document::parse("<div>$5.00 and <span>$3.00</span></div>");
        let adjusted = doc.adjust_prices(&AdjustmentSpec::additive(1.0), None);
        assert_eq!(adjusted, 2, "父节点一次处理两个金额，子节点不再处理");
        assert_eq!(doc.serialize(), "<div>$6.00 and <span>$4.00</span></div>");
    }

    #[test]
    fn test_marker_without_digits_skipped() {
        let mut doc = Document::parse("<p>cost $ unknown, real $2.00</p>");
        let adjusted = doc.adjust_prices(&AdjustmentSpec::additive(1.0), None);
        assert_eq!(adjusted, 1);
        assert_eq!(doc.serialize(), "<p>cost $ unknown, real $3.00</p>");
    }

    #[test]
    fn test_extract_amounts() {
        let doc = Document::parse("<p>$9.99</p><div><span>$1,234.5</span></div>");
        let mut amounts = doc.extract_amounts();
        amounts.sort_by(|a, b| a.node_path.cmp(&b.node_path));
        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].value, 9.99);
        assert_eq!(amounts[0].tag_name, "p");
        assert_eq!(amounts[1].value, 1234.5);
        assert_eq!(amounts[1].formatted, "1,234.50");
    }

    #[test]
    fn test_extract_then_apply_overrides() {
        let mut doc = Document::parse("<p>$9.99 and $5.00</p>");
        let mut amounts = doc.extract_amounts();
        assert_eq!(amounts.len(), 2);

        // 只改第二个金额
        for amount in &mut amounts {
            if amount.index == 1 {
                amount.value = 7.5;
            }
        }
        let second_only: Vec<_> = amounts.into_iter().filter(|a| a.index == 1).collect();
        let applied = doc.apply_overrides(second_only);
        assert_eq!(applied, 1);
        assert_eq!(doc.serialize(), "<p>$9.99 and $7.50</p>");
    }

    #[test]
    fn test_stats() {
        let doc = Document::parse("<div><p>$1.00</p><p>$2.00 $3.00</p></div>");
        let stats = doc.get_stats();
        assert_eq!(stats.element_count, 3);
        // div 覆盖全部3个金额，两个 p 都只是局部：唯一候选是 div
        assert_eq!(stats.candidate_count, 1);
        assert_eq!(stats.amount_count, 3);
        let rendered = format!("{}", stats);
        assert!(rendered.contains("金额数量: 3"));
    }

    #[test]
    fn test_adjust_subtree_only() {
        let mut doc =
            Document::parse("<div><span>$1.00</span></div><div><span>$1.00</span></div>");
        // 只扫描第二个 div 的后代
        let second = doc.root.resolve_path_mut(&[1]).unwrap();
        let adjusted = adjust(&AdjustmentSpec::additive(1.0), second, None);
        assert_eq!(adjusted, 1);
        assert_eq!(
            doc.serialize(),
            "<div><span>$1.00</span></div><div><span>$2.00</span></div>"
        );
    }
}
