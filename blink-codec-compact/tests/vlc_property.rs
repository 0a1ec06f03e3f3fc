//! VLC 编码的性质验证。
//!
//! # 教案式说明
//! - **Why**：VLC 是 Compact 格式一切字段的底座，任何边界错误都会
//!   放大成帧级损坏；用随机化性质测试覆盖手写用例难以穷举的位宽
//!   边界。
//! - **What**：往返恒等、空值标记互斥、再编码幂等三条核心性质。

use blink_codec_compact::vlc;
use proptest::prelude::*;

fn encode_u(value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    vlc::encode_u64(value, &mut out);
    out
}

fn encode_i(value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    vlc::encode_i64(value, &mut out);
    out
}

proptest! {
    /// 无符号往返恒等，且解码恰好消费编码产生的字节。
    #[test]
    fn u64_round_trip(value in any::<u64>()) {
        let bytes = encode_u(value);
        let decoded = vlc::decode_u64(&bytes, 0).unwrap();
        prop_assert_eq!(decoded.value, Some(value));
        prop_assert_eq!(decoded.end, bytes.len());
        prop_assert!(!decoded.overflowed);
    }

    /// 有符号往返恒等。
    #[test]
    fn i64_round_trip(value in any::<i64>()) {
        let bytes = encode_i(value);
        let decoded = vlc::decode_i64(&bytes, 0).unwrap();
        prop_assert_eq!(decoded.value, Some(value));
        prop_assert_eq!(decoded.end, bytes.len());
        prop_assert!(!decoded.overflowed);
    }

    /// 任何数值的编码都不与空值标记同形。
    #[test]
    fn no_value_encodes_as_null(value in any::<i64>()) {
        prop_assert_ne!(encode_i(value), vec![vlc::NULL_BYTE]);
    }

    /// 编码自带后缀自由性：紧随其后的任意字节不影响解码结果。
    #[test]
    fn decoding_ignores_trailing_bytes(value in any::<u64>(), suffix in any::<u8>()) {
        let mut bytes = encode_u(value);
        bytes.push(suffix);
        let decoded = vlc::decode_u64(&bytes, 0).unwrap();
        prop_assert_eq!(decoded.value, Some(value));
    }
}

/// 位宽边界的定向样本：符号位落点决定编码长度。
#[test]
fn boundary_lengths() {
    assert_eq!(encode_u(0).len(), 1);
    assert_eq!(encode_u(63).len(), 1);
    assert_eq!(encode_u(64).len(), 2);
    assert_eq!(encode_i(-64).len(), 2);
    assert_eq!(encode_i(-65).len(), 2);
    assert_eq!(encode_u(u64::MAX).len(), 10);
}
