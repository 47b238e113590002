use crate::utils::PriceError;
use std::str::FromStr;

/// 调整规格：固定增量或百分比
///
/// 一次调整调用期间不可变，对找到的每个金额统一生效。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentSpec {
    /// 增量数值（百分比模式下为百分数）
    pub delta: f64,
    /// 是否为百分比调整
    pub percent: bool,
}

impl AdjustmentSpec {
    /// 固定增量调整
    pub fn additive(delta: f64) -> Self {
        AdjustmentSpec { delta, percent: false }
    }

    /// 百分比调整
    pub fn percentage(delta: f64) -> Self {
        AdjustmentSpec { delta, percent: true }
    }

    /// 对数值应用调整并按两位小数四舍五入
    ///
    /// 两种模式走同一个舍入路径，保证结果一致。
    pub fn apply(&self, value: f64) -> f64 {
        let adjusted = if self.percent {
            value + value * self.delta / 100.0
        } else {
            value + self.delta
        };
        round2(adjusted)
    }

    /// 应用调整并输出标准格式（千位分组 + 两位小数）
    pub fn apply_formatted(&self, value: f64) -> String {
        format_amount(self.apply(value))
    }
}

impl FromStr for AdjustmentSpec {
    type Err = PriceError;

    /// 解析调整参数：`"2.5"`/`"-2.46"` 为固定增量，`"-14%"` 为百分比
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::InvalidAdjustment(s.to_string()));
        }

        if let Some(number) = trimmed.strip_suffix('%') {
            let delta: f64 = number
                .trim()
                .parse()
                .map_err(|_| PriceError::InvalidAdjustment(s.to_string()))?;
            return Ok(AdjustmentSpec::percentage(delta));
        }

        let delta: f64 = trimmed
            .parse()
            .map_err(|_| PriceError::InvalidAdjustment(s.to_string()))?;
        Ok(AdjustmentSpec::additive(delta))
    }
}

/// 两位小数四舍五入（0.5 进位）
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 格式化金额：整数部分自右向左每三位以 `,` 分组，保留两位小数
///
/// `1234.5` -> `"1,234.50"`
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let (int_part, frac_part) = fixed
        .split_once('.')
        .unwrap_or((fixed.as_str(), "00"));
    format!("{}.{}", group_thousands(int_part), frac_part)
}

/// 整数数字串的千位分组
fn group_thousands(digits: &str) -> String {
    // 负数超出支持范围，但也不在这里崩溃
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 3 == offset {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_additive() {
        let spec: AdjustmentSpec = "2.5".parse().unwrap();
        assert_eq!(spec, AdjustmentSpec::additive(2.5));

        let spec: AdjustmentSpec = "-2.46".parse().unwrap();
        assert_eq!(spec, AdjustmentSpec::additive(-2.46));
    }

    #[test]
    fn test_parse_percentage() {
        let spec: AdjustmentSpec = "-14%".parse().unwrap();
        assert_eq!(spec, AdjustmentSpec::percentage(-14.0));

        let spec: AdjustmentSpec = "+5%".parse().unwrap();
        assert_eq!(spec, AdjustmentSpec::percentage(5.0));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<AdjustmentSpec>().is_err());
        assert!("abc".parse::<AdjustmentSpec>().is_err());
        assert!("%".parse::<AdjustmentSpec>().is_err());
        assert!("1.2.3".parse::<AdjustmentSpec>().is_err());
    }

    #[test]
    fn test_apply_additive() {
        assert_eq!(AdjustmentSpec::additive(-2.46).apply(10.0), 7.54);
        assert_eq!(AdjustmentSpec::additive(1.0).apply(123.0), 124.0);
    }

    #[test]
    fn test_apply_percentage() {
        assert_eq!(AdjustmentSpec::percentage(-14.0).apply(100.0), 86.0);
        assert_eq!(AdjustmentSpec::percentage(50.0).apply(3.0), 4.5);
    }

    #[test]
    fn test_percentage_rounds_like_additive() {
        // 百分比路径与固定增量路径使用同一个两位舍入
        assert_eq!(AdjustmentSpec::percentage(10.0).apply(0.33), 0.36);
        assert_eq!(AdjustmentSpec::additive(0.033).apply(0.33), 0.36);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005000001), 1.01);
        assert_eq!(round2(7.544), 7.54);
        assert_eq!(round2(7.545000001), 7.55);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(0.99), "0.99");
        assert_eq!(format_amount(86.0), "86.00");
        assert_eq!(format_amount(1234567.89), "1,234,567.89");
        assert_eq!(format_amount(999.0), "999.00");
        assert_eq!(format_amount(1000.0), "1,000.00");
    }

    #[test]
    fn test_apply_formatted() {
        assert_eq!(AdjustmentSpec::additive(0.02).apply_formatted(9.99), "10.01");
        assert_eq!(AdjustmentSpec::additive(-90.0).apply_formatted(100.0), "10.00");
        assert_eq!(AdjustmentSpec::additive(0.0).apply_formatted(1234.56), "1,234.56");
    }
}
