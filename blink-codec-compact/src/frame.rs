//! Compact Binary 帧层：长度前缀与类型标识，不触碰字段内容。
//!
//! 提供给只关心帧边界的调用方（线上分流、转储工具）；字段级解码见
//! [`crate::decode`]。

use alloc::string::String;
use alloc::vec::Vec;

use blink_core::error::{BlinkError, Result};

use crate::vlc;

/// 一帧的原始视图：类型标识加字段区字节（含扩展块）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 帧内声明的类型标识。
    pub type_id: u64,
    /// 类型标识之后直到帧尾的全部字节。
    pub payload: Vec<u8>,
}

/// 为载荷加上 `length + typeId` 前导，组成一帧。
pub fn encode_frame(type_id: u64, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 10);
    vlc::encode_u64(type_id, &mut body);
    body.extend_from_slice(payload);
    let mut frame = Vec::with_capacity(body.len() + 5);
    vlc::encode_u64(body.len() as u64, &mut frame);
    frame.extend_from_slice(&body);
    frame
}

/// 从 `offset` 处切出一帧；返回帧与下一帧的偏移。
///
/// 载荷以拷贝返回：解码器不得在调用结束后继续引用输入缓冲。
pub fn decode_frame(buf: &[u8], offset: usize) -> Result<(Frame, usize)> {
    let length = vlc::decode_u64(buf, offset)?;
    let Some(body_len) = length.value else {
        return Err(
            BlinkError::framing(String::from("frame length cannot be NULL")).at_byte(offset),
        );
    };
    if length.overflowed {
        return Err(BlinkError::framing(String::from("frame length overflows")).at_byte(offset));
    }
    let body_start = length.end;
    let end = body_start
        .checked_add(body_len as usize)
        .filter(|end| *end <= buf.len())
        .ok_or_else(|| {
            BlinkError::framing(String::from("truncated Compact Binary frame")).at_byte(offset)
        })?;
    let type_id = vlc::decode_u64(&buf[..end], body_start)?;
    let Some(type_id_value) = type_id.value else {
        return Err(
            BlinkError::framing(String::from("frame type id cannot be NULL")).at_byte(body_start),
        );
    };
    if type_id.overflowed {
        return Err(
            BlinkError::framing(String::from("frame type id overflows")).at_byte(body_start),
        );
    }
    Ok((
        Frame {
            type_id: type_id_value,
            payload: buf[type_id.end..end].to_vec(),
        },
        end,
    ))
}

/// 顺序遍历缓冲中的帧。
pub struct FrameIter<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

/// 构造帧迭代器。
pub fn iter_frames(buf: &[u8]) -> FrameIter<'_> {
    FrameIter {
        buf,
        offset: 0,
        failed: false,
    }
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }
        match decode_frame(self.buf, self.offset) {
            Ok((frame, next)) => {
                self.offset = next;
                Some(Ok(frame))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
