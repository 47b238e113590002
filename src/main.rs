use anyhow::{bail, Context};
use clap::Parser;
use price_adjuster::{AdjustmentSpec, Document, ExtractedAmount, SUPPORTED_EXTENSIONS};

#[cfg(debug_assertions)]
use price_adjuster::DocumentDebugger;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "price_adjuster")]
#[command(about = "定位并调整HTML标记文本中的金额")]
#[command(version)]
struct Cli {
    /// 输入HTML文件路径（调整模式下也可以是目录，批量处理）
    #[arg(short, long)]
    input: PathBuf,

    /// 输出文件路径
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 调整模式：固定增量（如 "2.5"、"-2.46"）或百分比（如 "-14%"）
    #[arg(long, allow_hyphen_values = true)]
    adjust: Option<String>,

    /// 最多处理的候选节点数量
    #[arg(long)]
    limit: Option<usize>,

    /// 应用覆盖模式：从JSON文件按唯一键写回指定金额
    #[arg(long)]
    apply_overrides: Option<PathBuf>,

    /// 指定源编码（默认自动探测）
    #[arg(long)]
    encoding: Option<String>,

    /// 备份后就地覆盖输入文件
    #[arg(long)]
    in_place: bool,

    /// 显示文档统计信息
    #[arg(long)]
    stats: bool,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,

    /// 测试模式：解析文件后直接重建，用于验证解析和重建逻辑
    #[arg(long)]
    test_rebuild: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    validate_input(&cli)?;

    // 处理不同的操作模式
    if cli.test_rebuild {
        return handle_test_rebuild(&cli);
    }

    if cli.stats {
        return handle_stats(&cli);
    }

    if let Some(overrides_file) = &cli.apply_overrides {
        return handle_apply_overrides(&cli, overrides_file);
    }

    if let Some(adjustment) = &cli.adjust {
        return handle_adjustment(&cli, adjustment);
    }

    // 默认模式：金额提取
    handle_amount_extraction(&cli)
}

/// 验证输入文件
fn validate_input(cli: &Cli) -> anyhow::Result<()> {
    if !cli.input.exists() {
        bail!("输入文件不存在: {:?}", cli.input);
    }

    if cli.input.is_dir() {
        if cli.adjust.is_none() {
            bail!("目录输入只支持 --adjust 批量模式");
        }
        return Ok(());
    }

    if !has_supported_extension(&cli.input) {
        bail!("输入文件必须是HTML文件 ({})", SUPPORTED_EXTENSIONS.join("/"));
    }

    if cli.in_place && cli.output.is_some() {
        bail!("--in-place 与 --output 不能同时使用");
    }

    Ok(())
}

fn has_supported_extension(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    SUPPORTED_EXTENSIONS
        .iter()
        .any(|&ext| Some(ext) == extension.as_deref())
}

/// 加载文档（统一处理编码参数）
fn load_document(cli: &Cli, path: &Path) -> anyhow::Result<Document> {
    Document::load_with_encoding(path.to_path_buf(), cli.encoding.as_deref())
        .map_err(|e| anyhow::anyhow!("解析文档失败: {}", e))
}

/// 处理统一调整模式
fn handle_adjustment(cli: &Cli, adjustment: &str) -> anyhow::Result<()> {
    let spec: AdjustmentSpec = adjustment
        .parse()
        .with_context(|| format!("无法解析调整参数: {}", adjustment))?;

    if cli.input.is_dir() {
        return handle_batch_adjustment(cli, &spec);
    }

    let mut document = load_document(cli, &cli.input)?;
    let adjusted = document.adjust_prices(&spec, cli.limit);

    let output_path = resolve_adjust_output(cli)?;
    document
        .write_to_file(&output_path)
        .map_err(|e| anyhow::anyhow!("写入文件失败: {}", e))?;

    if !cli.quiet {
        println!("调整了 {} 个金额", adjusted);
        println!("结果已写入: {:?}", output_path);
    }

    Ok(())
}

/// 目录批量调整（并行处理）
fn handle_batch_adjustment(cli: &Cli, spec: &AdjustmentSpec) -> anyhow::Result<()> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&cli.input)? {
        let path = entry?.path();
        if path.is_file() && has_supported_extension(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        bail!("目录中没有可处理的HTML文件: {:?}", cli.input);
    }

    if !cli.quiet {
        println!("批量处理 {} 个文件", files.len());
    }

    let results: Vec<(PathBuf, Result<usize, String>)> = files
        .par_iter()
        .map(|path| {
            let result = adjust_one_file(cli, spec, path);
            (path.clone(), result)
        })
        .collect();

    let mut total = 0;
    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(count) => {
                total += count;
                if !cli.quiet {
                    println!("  {:?}: {} 个金额", path.file_name().unwrap_or_default(), count);
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("  {:?} 处理失败: {}", path, e);
            }
        }
    }

    if !cli.quiet {
        println!("批量完成: 共调整 {} 个金额", total);
    }
    if failures > 0 {
        bail!("{} 个文件处理失败", failures);
    }

    Ok(())
}

/// 调整单个文件（批量模式用，总是就地备份覆盖）
fn adjust_one_file(cli: &Cli, spec: &AdjustmentSpec, path: &Path) -> Result<usize, String> {
    price_adjuster::utils::create_backup(path).map_err(|e| e.to_string())?;

    let mut document = Document::load_with_encoding(path.to_path_buf(), cli.encoding.as_deref())
        .map_err(|e| e.to_string())?;
    let adjusted = document.adjust_prices(spec, cli.limit);
    document.write_to_file(path).map_err(|e| e.to_string())?;

    Ok(adjusted)
}

/// 确定调整模式的输出路径
fn resolve_adjust_output(cli: &Cli) -> anyhow::Result<PathBuf> {
    if cli.in_place {
        let backup_path = price_adjuster::utils::create_backup(&cli.input)
            .map_err(|e| anyhow::anyhow!("创建备份失败: {}", e))?;
        if !cli.quiet {
            println!("已创建备份文件: {:?}", backup_path);
        }
        return Ok(cli.input.clone());
    }

    Ok(cli.output.clone().unwrap_or_else(|| {
        let stem = cli.input.file_stem().unwrap().to_str().unwrap();
        let extension = cli.input.extension().unwrap().to_str().unwrap();
        cli.input
            .with_file_name(format!("{}_adjusted.{}", stem, extension))
    }))
}

/// 处理覆盖应用模式
fn handle_apply_overrides(cli: &Cli, overrides_file: &Path) -> anyhow::Result<()> {
    if !overrides_file.exists() {
        bail!("覆盖文件不存在: {:?}", overrides_file);
    }

    let content = std::fs::read_to_string(overrides_file)
        .with_context(|| format!("读取覆盖文件失败: {:?}", overrides_file))?;
    let overrides: Vec<ExtractedAmount> =
        serde_json::from_str(&content).context("解析覆盖JSON失败")?;

    if overrides.is_empty() {
        bail!("覆盖数据为空");
    }

    if !cli.quiet {
        println!("准备应用 {} 个覆盖条目", overrides.len());
        for (i, item) in overrides.iter().take(3).enumerate() {
            println!("覆盖条目 {}: [{}] -> {}", i + 1, item.get_unique_key(), item.value);
        }
        if overrides.len() > 3 {
            println!("... 还有 {} 个覆盖条目", overrides.len() - 3);
        }
    }

    let mut document = load_document(cli, &cli.input)?;
    document.apply_overrides(overrides);

    let output_path = resolve_adjust_output(cli)?;
    document
        .write_to_file(&output_path)
        .map_err(|e| anyhow::anyhow!("写入文件失败: {}", e))?;

    if !cli.quiet {
        println!("覆盖应用完成，输出到: {:?}", output_path);
    }

    Ok(())
}

/// 处理金额提取
fn handle_amount_extraction(cli: &Cli) -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    if !cli.quiet {
        println!("正在解析文档: {:?}", cli.input);
    }

    let document = load_document(cli, &cli.input)?;
    let amounts = document.extract_amounts();

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("json"));

    let json_output = serde_json::to_string_pretty(&amounts).context("序列化JSON失败")?;
    std::fs::write(&output_path, &json_output)
        .with_context(|| format!("写入文件失败: {:?}", output_path))?;

    if !cli.quiet {
        print_extraction_summary(&amounts, &output_path);
    }

    Ok(())
}

/// 打印提取摘要信息
fn print_extraction_summary(amounts: &[ExtractedAmount], output_path: &Path) {
    println!("提取到 {} 个金额", amounts.len());
    println!("结果已写入: {:?}", output_path);

    // 显示样例金额
    if !amounts.is_empty() {
        println!("\n样例金额:");
        for (i, amount) in amounts.iter().take(3).enumerate() {
            println!(
                "{}. [{}] <{}>: ${}",
                i + 1,
                amount.node_path,
                amount.tag_name,
                amount.formatted
            );
        }

        if amounts.len() > 3 {
            println!("... 还有 {} 个金额", amounts.len() - 3);
        }
    }
}

/// 处理统计模式
fn handle_stats(cli: &Cli) -> anyhow::Result<()> {
    let document = load_document(cli, &cli.input)?;
    println!("{}", document.get_stats());
    Ok(())
}

/// 处理测试重建模式
fn handle_test_rebuild(cli: &Cli) -> anyhow::Result<()> {
    if !cli.quiet {
        println!("测试模式：解析并重建文件 {:?}", cli.input);
    }

    let document = load_document(cli, &cli.input)?;

    let output_path = cli.output.clone().unwrap_or_else(|| {
        let stem = cli.input.file_stem().unwrap().to_str().unwrap();
        let extension = cli.input.extension().unwrap().to_str().unwrap();
        cli.input
            .with_file_name(format!("{}_rebuilt.{}", stem, extension))
    });

    document
        .write_to_file(&output_path)
        .map_err(|e| anyhow::anyhow!("写入文件失败: {}", e))?;

    generate_debug_info(&document, &cli.input, &output_path, cli.quiet)?;

    // 仅对 UTF-8 文档做字节级对比；其他编码经解码往返后允许字节级差异
    if document.encoding == "utf-8" {
        let original = std::fs::read(&cli.input)?;
        let rebuilt = std::fs::read(&output_path)?;
        if original == rebuilt {
            if !cli.quiet {
                println!("✓ 重建文件与原文件完全一致 ({} 字节)", original.len());
            }
        } else {
            println!(
                "⚠ 重建文件与原文件不一致: {} vs {} 字节",
                original.len(),
                rebuilt.len()
            );
        }
    }

    if !cli.quiet {
        println!("测试完成，重建文件输出到: {:?}", output_path);
    }

    Ok(())
}

/// 生成调试信息
#[cfg(debug_assertions)]
fn generate_debug_info(
    document: &Document,
    input_path: &Path,
    output_path: &Path,
    quiet: bool,
) -> anyhow::Result<()> {
    let dump_path = input_path.with_extension("tree.dump");
    if !quiet {
        println!("生成文档结构dump: {:?}", dump_path);
    }
    DocumentDebugger::dump_tree_structure(document, dump_path)
        .map_err(|e| anyhow::anyhow!("生成dump失败: {}", e))?;

    let compare_path = input_path.with_extension("compare.txt");
    if !quiet {
        println!("生成结构对比报告: {:?}", compare_path);
    }
    DocumentDebugger::compare_structures(
        input_path.to_path_buf(),
        output_path.to_path_buf(),
        compare_path,
    )
    .map_err(|e| anyhow::anyhow!("生成对比报告失败: {}", e))?;

    Ok(())
}

#[cfg(not(debug_assertions))]
fn generate_debug_info(
    _document: &Document,
    _input_path: &Path,
    _output_path: &Path,
    _quiet: bool,
) -> anyhow::Result<()> {
    Ok(())
}
