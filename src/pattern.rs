use crate::datatypes::is_amount_char;
use crate::CURRENCY_MARKER;

/// 金额扫描状态
///
/// 金额有两种形式：
/// - 标记符 + 首位数字 + 任意数字/`.`/`,` 序列（如 `$1,234.56`）
/// - 标记符 + `.` + 两位小数，无整数部分（如 `$.99`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// 寻找标记符
    Seeking,
    /// 刚读到标记符，等待首位数字或小数点
    AfterMarker,
    /// 已确认金额，继续吞掉数字序列
    DigitRun,
    /// 无整数形式：等待第一位小数
    FractionFirst,
    /// 无整数形式：等待第二位小数
    FractionSecond,
}

/// 统计可见文本中的金额出现次数
pub fn count_amounts(text: &str) -> usize {
    let mut count = 0;
    let mut state = ScanState::Seeking;

    for c in text.chars() {
        state = match state {
            ScanState::Seeking => {
                if c == CURRENCY_MARKER {
                    ScanState::AfterMarker
                } else {
                    ScanState::Seeking
                }
            }
            ScanState::AfterMarker => {
                if c.is_ascii_digit() {
                    count += 1;
                    ScanState::DigitRun
                } else if c == '.' {
                    ScanState::FractionFirst
                } else if c == CURRENCY_MARKER {
                    ScanState::AfterMarker
                } else {
                    ScanState::Seeking
                }
            }
            ScanState::DigitRun => {
                if is_amount_char(c) {
                    ScanState::DigitRun
                } else if c == CURRENCY_MARKER {
                    ScanState::AfterMarker
                } else {
                    ScanState::Seeking
                }
            }
            ScanState::FractionFirst => {
                if c.is_ascii_digit() {
                    ScanState::FractionSecond
                } else if c == CURRENCY_MARKER {
                    ScanState::AfterMarker
                } else {
                    ScanState::Seeking
                }
            }
            ScanState::FractionSecond => {
                if c.is_ascii_digit() {
                    count += 1;
                    ScanState::DigitRun
                } else if c == CURRENCY_MARKER {
                    ScanState::AfterMarker
                } else {
                    ScanState::Seeking
                }
            }
        };
    }

    count
}

/// 可见文本中是否存在金额
pub fn has_amount(text: &str) -> bool {
    count_amounts(text) > 0
}
