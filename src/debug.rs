use crate::document::Document;
use crate::element::{Element, NodeChild};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 文档结构调试器
pub struct DocumentDebugger;

impl DocumentDebugger {
    /// 生成详细的文档结构dump
    pub fn dump_tree_structure(document: &Document, output_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let mut output = File::create(output_path)?;

        Self::write_header_info(&mut output, document)?;

        writeln!(output, "=== 节点树 ===")?;
        for (i, child) in document.root.children.iter().enumerate() {
            writeln!(output, "顶层节点 {}:", i)?;
            Self::dump_child(child, &mut output, 1)?;
        }

        Ok(())
    }

    /// 写入头部信息
    fn write_header_info(output: &mut File, document: &Document) -> Result<(), Box<dyn std::error::Error>> {
        let stats = document.get_stats();
        writeln!(output, "=== 文档结构dump ===")?;
        writeln!(output, "文件: {}", document.get_name())?;
        writeln!(output, "编码: {}", document.encoding)?;
        writeln!(output, "元素数量: {}", stats.element_count)?;
        writeln!(output, "候选节点数量: {}", stats.candidate_count)?;
        writeln!(output, "金额数量: {}", stats.amount_count)?;
        writeln!(output)?;
        Ok(())
    }

    /// Dump 单个子节点
    fn dump_child(child: &NodeChild, output: &mut File, indent: usize) -> Result<(), Box<dyn std::error::Error>> {
        let prefix = "  ".repeat(indent);
        match child {
            NodeChild::Element(element) => Self::dump_element(element, output, indent)?,
            NodeChild::Text(text) => {
                writeln!(output, "{}文本: {:?}", prefix, preview(text))?;
            }
            NodeChild::Raw(raw) => {
                writeln!(output, "{}原样标记: {:?}", prefix, preview(raw))?;
            }
        }
        Ok(())
    }

    /// Dump 元素结构
    fn dump_element(element: &Element, output: &mut File, indent: usize) -> Result<(), Box<dyn std::error::Error>> {
        let prefix = "  ".repeat(indent);

        writeln!(output, "{}<{}> {{", prefix, element.tag_name)?;
        writeln!(output, "{}  开始标签: {:?}", prefix, element.raw_open_tag)?;
        writeln!(output, "{}  标志位: {:?}", prefix, element.flags)?;
        writeln!(output, "{}  子节点数: {}", prefix, element.children.len())?;

        for (i, child) in element.children.iter().enumerate() {
            writeln!(output, "{}  子节点 {}:", prefix, i)?;
            Self::dump_child(child, output, indent + 2)?;
        }

        writeln!(output, "{}}}", prefix)?;
        Ok(())
    }

    /// 对比两个文件的结构
    pub fn compare_structures(
        original_path: PathBuf,
        rebuilt_path: PathBuf,
        output_path: PathBuf,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let original = Document::load(original_path.clone())?;
        let rebuilt = Document::load(rebuilt_path.clone())?;

        let mut output = File::create(output_path)?;

        Self::write_comparison_header(&mut output, &original_path, &rebuilt_path)?;
        Self::compare_basic_info(&mut output, &original, &rebuilt)?;
        Self::compare_top_level(&mut output, &original, &rebuilt)?;

        Ok(())
    }

    /// 写入对比头部
    fn write_comparison_header(output: &mut File, original_path: &Path, rebuilt_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        writeln!(output, "=== 文档结构对比 ===")?;
        writeln!(output, "原始文件: {}", original_path.display())?;
        writeln!(output, "重建文件: {}", rebuilt_path.display())?;
        writeln!(output)?;
        Ok(())
    }

    /// 对比基本信息
    fn compare_basic_info(output: &mut File, original: &Document, rebuilt: &Document) -> Result<(), Box<dyn std::error::Error>> {
        let original_stats = original.get_stats();
        let rebuilt_stats = rebuilt.get_stats();

        writeln!(output, "=== 基本信息对比 ===")?;
        writeln!(output, "元素数量: {} vs {}", original_stats.element_count, rebuilt_stats.element_count)?;
        writeln!(output, "文本节点数量: {} vs {}", original_stats.text_run_count, rebuilt_stats.text_run_count)?;
        writeln!(output, "金额数量: {} vs {}", original_stats.amount_count, rebuilt_stats.amount_count)?;

        if original_stats.element_count != rebuilt_stats.element_count {
            writeln!(output, "⚠ 元素数量不匹配！")?;
        }

        let original_markup = original.serialize();
        let rebuilt_markup = rebuilt.serialize();
        if original_markup == rebuilt_markup {
            writeln!(output, "✓ 序列化结果一致 ({} 字节)", original_markup.len())?;
        } else {
            writeln!(output, "⚠ 序列化结果不一致: {} vs {} 字节", original_markup.len(), rebuilt_markup.len())?;
            if let Some(pos) = first_difference(&original_markup, &rebuilt_markup) {
                writeln!(output, "  首个差异位置: {}", pos)?;
            }
        }
        writeln!(output)?;
        Ok(())
    }

    /// 对比顶层节点
    fn compare_top_level(output: &mut File, original: &Document, rebuilt: &Document) -> Result<(), Box<dyn std::error::Error>> {
        writeln!(output, "=== 顶层节点对比 ===")?;
        let min_len = std::cmp::min(original.root.children.len(), rebuilt.root.children.len());

        for i in 0..min_len {
            let left = describe_child(&original.root.children[i]);
            let right = describe_child(&rebuilt.root.children[i]);
            if left == right {
                writeln!(output, "✓ 节点 {}: {}", i, left)?;
            } else {
                writeln!(output, "⚠ 节点 {}: {} vs {}", i, left, right)?;
            }
        }

        if original.root.children.len() != rebuilt.root.children.len() {
            writeln!(output, "⚠ 顶层节点数量不匹配: {} vs {}",
                original.root.children.len(), rebuilt.root.children.len())?;
        }

        Ok(())
    }
}

/// 子节点的摘要描述
fn describe_child(child: &NodeChild) -> String {
    match child {
        NodeChild::Element(el) => format!("<{}> ({} 子节点)", el.tag_name, el.children.len()),
        NodeChild::Text(t) => format!("文本 ({} 字节)", t.len()),
        NodeChild::Raw(r) => format!("原样标记 ({} 字节)", r.len()),
    }
}

/// 文本预览（截断到32个字符）
fn preview(text: &str) -> String {
    if text.chars().count() > 32 {
        format!("{}...", text.chars().take(32).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 首个差异的字节位置
fn first_difference(left: &str, right: &str) -> Option<usize> {
    left.bytes()
        .zip(right.bytes())
        .position(|(a, b)| a != b)
        .or_else(|| {
            if left.len() != right.len() {
                Some(std::cmp::min(left.len(), right.len()))
            } else {
                None
            }
        })
}
