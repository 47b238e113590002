/// 拼接改写：把新的格式化字符写回偏移映射指定的位置
///
/// 以原始标记文本为只读输入构建新串：偏移映射之外的每个字节
/// 原样拷贝，映射位置按右对齐规则替换——
/// - 新串较短：最左侧多出的映射位置被删除；
/// - 新串较长：多出的前缀插入到第一个映射位置。
///
/// 右对齐使得改写只在数字序列内部伸缩，其余字符的相对位置不变。
pub fn splice(markup: &str, offsets: &[usize], replacement: &str) -> String {
    debug_assert!(!offsets.is_empty(), "偏移映射不能为空");
    debug_assert!(
        offsets.windows(2).all(|w| w[0] < w[1]),
        "偏移映射必须严格递增"
    );

    let new_chars: Vec<char> = replacement.chars().collect();
    let slots = offsets.len() as isize;
    let extra = new_chars.len() as isize - slots;

    let mut out = String::with_capacity(markup.len() + replacement.len());
    let mut copied_to = 0;

    for (slot, &offset) in offsets.iter().enumerate() {
        // 拷贝上一个映射位置到当前位置之间的原始字节
        out.push_str(&markup[copied_to..offset]);

        let slot = slot as isize;
        if slot == 0 && extra > 0 {
            // 新串较长：剩余前缀连同首位一起写入第一个位置
            for &c in &new_chars[..(extra + 1) as usize] {
                out.push(c);
            }
        } else {
            let source = slot + extra;
            if source >= 0 {
                out.push(new_chars[source as usize]);
            }
            // source < 0：该位置被删除
        }

        // 映射位置上的字符都是单字节（数字或分隔符）
        copied_to = offset + 1;
    }

    out.push_str(&markup[copied_to..]);
    out
}
