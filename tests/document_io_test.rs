//! 文档文件读写集成测试
//!
//! 覆盖：
//! - 解析 -> 序列化 -> 写回 的字节级还原
//! - 多编码加载与写回
//! - 提取JSON -> 修改 -> 覆盖应用 的完整往返
//! - 就地备份

use price_adjuster::datatypes::RawString;
use price_adjuster::{AdjustmentSpec, Document, ExtractedAmount};
use std::path::PathBuf;

fn write_fixture(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_load_rebuild_byte_identity() {
    let dir = tempfile::tempdir().unwrap();
    let source = concat!(
        "<!DOCTYPE html>\n",
        "<html>\n<head><meta charset=\"utf-8\"><title>目录</title></head>\n",
        "<body>\n",
        "  <h1>价格表</h1>\n",
        "  <p class='a'>basic: $19.99</p>\n",
        "  <p>bundle: <b>$1</b>49.50</p>\n",
        "  <!-- 注释里的 $8 不算 -->\n",
        "</body>\n</html>\n"
    );
    let input = write_fixture(&dir, "catalog.html", source.as_bytes());

    let doc = Document::load(input).expect("应该能够加载文档");
    assert_eq!(doc.encoding, "utf-8");

    let output = dir.path().join("rebuilt.html");
    doc.write_to_file(&output).expect("应该能够写回文档");

    let rebuilt = std::fs::read(&output).unwrap();
    assert_eq!(rebuilt, source.as_bytes(), "未修改的文档必须逐字节还原");
}

#[test]
fn test_adjust_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(
        &dir,
        "page.html",
        b"<div>Total: <span>$5.00</span></div><p>$9.99</p>",
    );

    let mut doc = Document::load(input).unwrap();
    let adjusted = doc.adjust_prices(&AdjustmentSpec::additive(0.02), None);
    assert_eq!(adjusted, 2);

    let output = dir.path().join("out.html");
    doc.write_to_file(&output).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content, "<div>Total: <span>$5.02</span></div><p>$10.01</p>");
}

#[test]
fn test_windows1252_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    // windows-1252 专有字节：0xE9 = é
    let bytes: Vec<u8> = b"<p>caf\xE9 menu: $4.50</p>".to_vec();
    let input = write_fixture(&dir, "menu.html", &bytes);

    let mut doc =
        Document::load_with_encoding(input, Some("windows-1252")).expect("应该能够按指定编码加载");
    assert_eq!(doc.encoding, "windows-1252");
    assert!(doc.root.text().contains("café"));

    doc.adjust_prices(&AdjustmentSpec::additive(0.5), None);

    let output = dir.path().join("menu_out.html");
    doc.write_to_file(&output).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, b"<p>caf\xE9 menu: $5.00</p>", "写回必须沿用源编码");
}

#[test]
fn test_unknown_encoding_label_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(&dir, "x.html", b"<p>$1</p>");
    let result = Document::load_with_encoding(input, Some("no-such-encoding"));
    assert!(result.is_err(), "未知编码标签应该报错");
}

#[test]
fn test_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(&dir, "empty.html", b"");
    let doc = Document::load(input).expect("空文件应该能够加载");
    assert_eq!(doc.serialize(), "");
    assert_eq!(doc.get_stats().element_count, 0);
}

#[test]
fn test_extract_edit_apply_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(
        &dir,
        "shop.html",
        b"<p>first $10.00</p><p>second $20.00</p>",
    );

    // 第一步：提取为JSON
    let doc = Document::load(input.clone()).unwrap();
    let amounts = doc.extract_amounts();
    assert_eq!(amounts.len(), 2);

    let json_path = dir.path().join("amounts.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&amounts).unwrap()).unwrap();

    // 第二步：修改JSON中的一个数值
    let content = std::fs::read_to_string(&json_path).unwrap();
    let mut edited: Vec<ExtractedAmount> = serde_json::from_str(&content).unwrap();
    for amount in &mut edited {
        if amount.value == 20.0 {
            amount.value = 1234.5;
        }
    }

    // 第三步：按唯一键写回
    let mut doc = Document::load(input).unwrap();
    let applied = doc.apply_overrides(edited);
    assert_eq!(applied, 2, "两个键都应匹配（其中一个数值不变）");

    assert_eq!(
        doc.serialize(),
        "<p>first $10.00</p><p>second $1,234.50</p>",
        "只有被修改的金额发生变化，且按标准格式写回"
    );
}

#[test]
fn test_create_backup() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(&dir, "orig.html", b"<p>$1.00</p>");

    let backup = price_adjuster::utils::create_backup(&input).expect("应该能够创建备份");
    assert!(backup.exists());
    assert_eq!(std::fs::read(&backup).unwrap(), b"<p>$1.00</p>");
}

#[test]
fn test_raw_string_multi_encoding_detection() {
    let utf8 = RawString::decode("价格 $9.99".as_bytes());
    assert_eq!(utf8.encoding, "utf-8");
    assert!(utf8.content.contains("$9.99"));
}

#[test]
fn test_stats_on_loaded_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(
        &dir,
        "stats.html",
        b"<div><p>$1.00 and $2.00</p><p>plain</p></div>",
    );

    let doc = Document::load(input).unwrap();
    let stats = doc.get_stats();
    assert_eq!(stats.name, "stats.html");
    assert_eq!(stats.element_count, 3);
    assert_eq!(stats.candidate_count, 1);
    assert_eq!(stats.amount_count, 2);
}
