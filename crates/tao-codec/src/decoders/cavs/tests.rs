use std::collections::VecDeque;

use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

use super::*;

// ============================================================
// 脚本化 bin 来源
// ============================================================

/// 一次 bin 请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinCall {
    Ctx(usize),
    Weighted(usize, usize),
    Bypass,
}

/// 按预设序列返回判决结果, 并记录每次请求的上下文
struct ScriptedBins {
    script: VecDeque<bool>,
    calls: Vec<BinCall>,
}

impl ScriptedBins {
    fn new(bins: &[u8]) -> Self {
        Self {
            script: bins.iter().map(|&b| b != 0).collect(),
            calls: Vec::new(),
        }
    }

    fn next(&mut self, call: BinCall) -> TaoResult<bool> {
        self.calls.push(call);
        self.script.pop_front().ok_or(TaoError::Eof)
    }

    fn ctx_calls(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BinCall::Ctx(idx) => Some(*idx),
                _ => None,
            })
            .collect()
    }

    fn assert_drained(&self) {
        assert!(self.script.is_empty(), "剩余未消费的 bin: {:?}", self.script);
    }
}

impl BinDecoder for ScriptedBins {
    fn decode_symbol(&mut self, ctx_idx: usize) -> TaoResult<bool> {
        self.next(BinCall::Ctx(ctx_idx))
    }

    fn decode_symbol_weighted(&mut self, ctx_a: usize, ctx_b: usize) -> TaoResult<bool> {
        self.next(BinCall::Weighted(ctx_a, ctx_b))
    }

    fn decode_bypass(&mut self) -> TaoResult<bool> {
        self.next(BinCall::Bypass)
    }
}

// ============================================================
// 宏块层语法元素
// ============================================================

#[test]
fn test_skip_run_context_saturates() {
    let mut bins = ScriptedBins::new(&[0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(decode_mb_skip_run(&mut bins, 100).unwrap(), 6);
    assert_eq!(bins.ctx_calls(), vec![0, 1, 2, 3, 3, 3, 3]);
    bins.assert_drained();
}

#[test]
fn test_skip_run_exceeding_limit() {
    let mut bins = ScriptedBins::new(&[0; 8]);
    let err = decode_mb_skip_run(&mut bins, 2).unwrap_err();
    assert!(matches!(
        err,
        TaoError::SyntaxOutOfRange {
            element: "mb_skip_run",
            value: 3,
            limit: 2,
        }
    ));
    assert_eq!(bins.calls.len(), 3);
}

#[test]
fn test_mb_type_p() {
    let mut bins = ScriptedBins::new(&[0, 0, 1]);
    assert_eq!(decode_mb_type_p(&mut bins).unwrap(), 2);
    assert_eq!(bins.ctx_calls(), vec![4, 5, 6]);

    let mut bins = ScriptedBins::new(&[0, 0, 0, 0, 1]);
    assert_eq!(decode_mb_type(&mut bins, SliceKind::P, NeighborFlags::all()).unwrap(), 4);
    assert_eq!(bins.ctx_calls(), vec![4, 5, 6, 7, 8]);

    let mut bins = ScriptedBins::new(&[0; 6]);
    assert!(
        decode_mb_type_p(&mut bins)
            .unwrap_err()
            .is_syntax_out_of_range()
    );
}

#[test]
fn test_mb_type_b_direct() {
    let mut bins = ScriptedBins::new(&[0]);
    let flags = NeighborFlags::LEFT | NeighborFlags::TOP;
    assert_eq!(decode_mb_type_b(&mut bins, flags).unwrap(), 0);
    assert_eq!(bins.ctx_calls(), vec![6]);
}

#[test]
fn test_mb_type_b_unary_tail() {
    let mut bins = ScriptedBins::new(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    let value = decode_mb_type(&mut bins, SliceKind::B, NeighborFlags::TOP).unwrap();
    assert_eq!(value, 9);
    assert_eq!(
        bins.ctx_calls(),
        vec![5, 12, 13, 14, 15, 16, 17, 18, 18, 18]
    );
    bins.assert_drained();

    let mut bins = ScriptedBins::new(&[1, 1]);
    assert_eq!(decode_mb_type_b(&mut bins, NeighborFlags::empty()).unwrap(), 1);
    assert_eq!(bins.ctx_calls(), vec![4, 12]);
}

#[test]
fn test_mb_type_b_max() {
    let mut script = vec![1u8];
    script.extend(std::iter::repeat_n(0, 22));
    script.push(1);
    let mut bins = ScriptedBins::new(&script);
    assert_eq!(decode_mb_type_b(&mut bins, NeighborFlags::empty()).unwrap(), 23);

    let mut script = vec![1u8];
    script.extend(std::iter::repeat_n(0, 30));
    let mut bins = ScriptedBins::new(&script);
    assert!(
        decode_mb_type_b(&mut bins, NeighborFlags::empty())
            .unwrap_err()
            .is_syntax_out_of_range()
    );
}

#[test]
fn test_mb_part_type_tree() {
    let mut bins = ScriptedBins::new(&[1, 0]);
    assert_eq!(decode_mb_part_type(&mut bins).unwrap(), 2);
    assert_eq!(bins.ctx_calls(), vec![19, 21]);

    let mut bins = ScriptedBins::new(&[0, 1]);
    assert_eq!(decode_mb_part_type(&mut bins).unwrap(), 1);
    assert_eq!(bins.ctx_calls(), vec![19, 20]);
}

#[test]
fn test_intra_luma_pred_mode_truncated() {
    let mut bins = ScriptedBins::new(&[0, 0, 0, 0]);
    assert_eq!(decode_intra_luma_pred_mode(&mut bins).unwrap(), 4);
    assert_eq!(bins.ctx_calls(), vec![22, 23, 24, 25]);
    bins.assert_drained();

    let mut bins = ScriptedBins::new(&[0, 1]);
    assert_eq!(decode_intra_luma_pred_mode(&mut bins).unwrap(), 1);
    assert_eq!(bins.ctx_calls(), vec![22, 23]);
}

#[test]
fn test_intra_chroma_pred_mode() {
    let mut bins = ScriptedBins::new(&[1, 1, 1]);
    assert_eq!(
        decode_intra_chroma_pred_mode(&mut bins, NeighborFlags::LEFT).unwrap(),
        3
    );
    assert_eq!(bins.ctx_calls(), vec![27, 29, 29]);

    let mut bins = ScriptedBins::new(&[1, 0]);
    assert_eq!(
        decode_intra_chroma_pred_mode(&mut bins, NeighborFlags::all()).unwrap(),
        1
    );
    assert_eq!(bins.ctx_calls(), vec![28, 29]);

    let mut bins = ScriptedBins::new(&[0]);
    assert_eq!(
        decode_intra_chroma_pred_mode(&mut bins, NeighborFlags::empty()).unwrap(),
        0
    );
    assert_eq!(bins.ctx_calls(), vec![26]);
}

#[test]
fn test_reference_index() {
    let mut bins = ScriptedBins::new(&[1, 1, 0]);
    assert_eq!(
        decode_mb_reference_index(&mut bins, NeighborFlags::TOP, 3).unwrap(),
        2
    );
    assert_eq!(bins.ctx_calls(), vec![32, 34, 35]);

    let mut bins = ScriptedBins::new(&[1, 1, 1]);
    assert_eq!(
        decode_mb_reference_index(&mut bins, NeighborFlags::all(), 3).unwrap(),
        3
    );
    assert_eq!(bins.ctx_calls(), vec![33, 34, 35]);
    bins.assert_drained();

    let mut bins = ScriptedBins::new(&[]);
    assert_eq!(
        decode_mb_reference_index(&mut bins, NeighborFlags::LEFT, 0).unwrap(),
        0
    );
    assert!(bins.calls.is_empty());
}

#[test]
fn test_mvd_ctx_inc_thresholds() {
    assert_eq!(mvd_ctx_inc(0), 0);
    assert_eq!(mvd_ctx_inc(1), 0);
    assert_eq!(mvd_ctx_inc(2), 1);
    assert_eq!(mvd_ctx_inc(15), 1);
    assert_eq!(mvd_ctx_inc(16), 2);
    assert_eq!(mvd_ctx_inc(500), 2);
}

#[test]
fn test_mv_diff_small_magnitudes() {
    let mut bins = ScriptedBins::new(&[0]);
    assert_eq!(decode_mv_diff(&mut bins, SyntaxElement::MvDiffX, 1).unwrap(), 0);
    assert_eq!(bins.calls, vec![BinCall::Ctx(37)]);

    let mut bins = ScriptedBins::new(&[1, 0, 1]);
    assert_eq!(decode_mv_diff(&mut bins, SyntaxElement::MvDiffX, 1).unwrap(), -1);
    assert_eq!(
        bins.calls,
        vec![BinCall::Ctx(37), BinCall::Ctx(39), BinCall::Bypass]
    );

    let mut bins = ScriptedBins::new(&[1, 1, 0, 0]);
    assert_eq!(decode_mv_diff(&mut bins, SyntaxElement::MvDiffY, 2).unwrap(), 2);
    assert_eq!(
        bins.calls,
        vec![
            BinCall::Ctx(44),
            BinCall::Ctx(45),
            BinCall::Ctx(46),
            BinCall::Bypass
        ]
    );
}

#[test]
fn test_mv_diff_exp_golomb_suffix() {
    // parity=1, lzb=2, suffix=0b10, 负号
    let mut bins = ScriptedBins::new(&[1, 1, 1, 1, 0, 0, 1, 1, 0, 1]);
    assert_eq!(decode_mv_diff(&mut bins, SyntaxElement::MvDiffX, 0).unwrap(), -14);
    assert_eq!(bins.ctx_calls(), vec![36, 39, 40, 41]);
    assert_eq!(
        bins.calls.iter().filter(|c| **c == BinCall::Bypass).count(),
        6
    );
    bins.assert_drained();

    // parity=0, lzb=0, 正号
    let mut bins = ScriptedBins::new(&[1, 1, 1, 0, 1, 0]);
    assert_eq!(decode_mv_diff(&mut bins, SyntaxElement::MvDiffX, 0).unwrap(), 3);
}

#[test]
fn test_mv_diff_prefix_overflow() {
    let mut script = vec![1u8, 1, 1, 0];
    script.extend(std::iter::repeat_n(0, 20));
    let mut bins = ScriptedBins::new(&script);
    let err = decode_mv_diff(&mut bins, SyntaxElement::MvDiffY, 0).unwrap_err();
    assert!(matches!(
        err,
        TaoError::SyntaxOutOfRange {
            element: "mv_diff_y",
            ..
        }
    ));
}

#[test]
fn test_mvd_pair() {
    let mut bins = ScriptedBins::new(&[1, 0, 0, 0]);
    let mvd = decode_mvd(&mut bins, 2, 0).unwrap();
    assert_eq!(mvd, Mvd { x: 1, y: 0 });
    assert_eq!(bins.ctx_calls(), vec![38, 39, 42]);
}

#[test]
fn test_cbp_luma_neighbors_inside_macroblock() {
    let mut bins = ScriptedBins::new(&[1, 0, 1, 1, 0]);
    let cbp = decode_cbp(&mut bins, None, None, ChromaFormat::Yuv420).unwrap();
    assert_eq!(cbp, 0b1101);
    assert_eq!(bins.ctx_calls(), vec![48, 49, 50, 49, 52]);
}

#[test]
fn test_cbp_neighbor_macroblocks_and_chroma() {
    let mut bins = ScriptedBins::new(&[0, 0, 0, 0, 1, 0, 1]);
    let cbp = decode_cbp(&mut bins, Some(0b1111), Some(0b1111), ChromaFormat::Yuv420).unwrap();
    assert_eq!(cbp, 32);
    // 块 0: 左 1 与上 2 均置位; 块 1: 仅上 3; 块 2: 仅左 3; 块 3: 内部均为 0
    assert_eq!(bins.ctx_calls(), vec![51, 50, 49, 48, 52, 53, 53]);

    let mut bins = ScriptedBins::new(&[0, 0, 0, 0, 1, 0, 0]);
    assert_eq!(
        decode_cbp(&mut bins, None, None, ChromaFormat::Yuv420).unwrap(),
        16
    );
}

#[test]
fn test_cbp_422_extension() {
    let mut bins = ScriptedBins::new(&[0, 0, 0, 0, 1, 1, 1, 0]);
    let cbp = decode_cbp(&mut bins, None, None, ChromaFormat::Yuv422).unwrap();
    assert_eq!(cbp, 48 | (0b10 << 6));
    assert_eq!(&bins.calls[6..], &[BinCall::Bypass, BinCall::Bypass]);
    bins.assert_drained();
}

#[test]
fn test_qp_delta_mapping() {
    let mut bins = ScriptedBins::new(&[1, 1, 1, 0]);
    assert_eq!(decode_mb_qp_delta(&mut bins, true).unwrap(), 2);
    assert_eq!(bins.ctx_calls(), vec![55, 56, 57, 57]);

    let mut bins = ScriptedBins::new(&[0]);
    assert_eq!(decode_mb_qp_delta(&mut bins, false).unwrap(), 0);
    assert_eq!(bins.ctx_calls(), vec![54]);

    let mut bins = ScriptedBins::new(&[1, 1, 0]);
    assert_eq!(decode_mb_qp_delta(&mut bins, false).unwrap(), -1);
}

#[test]
fn test_qp_delta_overflow() {
    let mut bins = ScriptedBins::new(&[1; 70]);
    let err = decode_mb_qp_delta(&mut bins, false).unwrap_err();
    assert!(matches!(
        err,
        TaoError::SyntaxOutOfRange {
            element: "mb_qp_delta",
            value: 65,
            limit: 64,
        }
    ));
}

#[test]
fn test_weighting_prediction_flag() {
    let mut bins = ScriptedBins::new(&[1]);
    assert!(decode_weighting_prediction(&mut bins).unwrap());
    assert_eq!(bins.ctx_calls(), vec![322]);
}

#[test]
fn test_exhausted_script_propagates_eof() {
    let mut bins = ScriptedBins::new(&[0, 0]);
    assert!(decode_mb_skip_run(&mut bins, 10).unwrap_err().is_eof());
}

// ============================================================
// 变换系数
// ============================================================

#[test]
fn test_coeff_plane_selection() {
    assert_eq!(CoeffPlane::from_picture(false, false), CoeffPlane::FrameLuma);
    assert_eq!(CoeffPlane::from_picture(false, true), CoeffPlane::FrameChroma);
    assert_eq!(CoeffPlane::from_picture(true, false), CoeffPlane::FieldLuma);
    assert_eq!(CoeffPlane::from_picture(true, true), CoeffPlane::FieldChroma);
    assert_eq!(CoeffPlane::FrameLuma.ctx_base(), 58);
    assert_eq!(CoeffPlane::FrameChroma.ctx_base(), 124);
    assert_eq!(CoeffPlane::FieldLuma.ctx_base(), 190);
    assert_eq!(CoeffPlane::FieldChroma.ctx_base(), 256);
}

#[test]
fn test_primary_index_saturation() {
    let expected = [(0, 0), (1, 1), (2, 2), (3, 3), (4, 3), (5, 4), (100, 4)];
    for (max_level, pri) in expected {
        assert_eq!(CoeffScanState::primary_index_for(max_level), pri);
    }
}

#[test]
fn test_coeff_block_two_pairs_then_eob() {
    let script = [
        1, // level=1
        0, // 正号
        0, 0, 1, // run=2
        0, // 非 EOB
        0, 0, 1, // level=3
        1, // 负号
        1, // run=0
        1, // EOB
    ];
    let mut bins = ScriptedBins::new(&script);
    let mut out = Vec::new();
    let state = decode_coeff_block(&mut bins, CoeffPlane::FrameLuma, &mut out).unwrap();

    assert_eq!(
        out,
        vec![
            RunLevel { level: 1, run: 2 },
            RunLevel { level: -3, run: 0 },
        ]
    );
    assert_eq!(state.position, 4);
    assert_eq!(state.max_level, 3);
    assert_eq!(state.primary_index, 3);
    bins.assert_drained();

    let base = 58;
    assert_eq!(
        bins.calls,
        vec![
            BinCall::Ctx(base),
            BinCall::Bypass,
            BinCall::Ctx(base + 46),
            BinCall::Ctx(base + 47),
            BinCall::Ctx(base + 47),
            BinCall::Weighted(base + 2, base + 15),
            BinCall::Ctx(base + 3),
            BinCall::Ctx(base + 4),
            BinCall::Ctx(base + 4),
            BinCall::Bypass,
            BinCall::Ctx(base + 46 + 4 + 2),
            BinCall::Weighted(base + 8, base + 16),
        ]
    );
}

#[test]
fn test_coeff_block_full_without_eob() {
    let mut script = vec![1u8, 0];
    script.extend(std::iter::repeat_n(0, 63));
    script.push(1);
    let mut bins = ScriptedBins::new(&script);
    let mut out = vec![RunLevel { level: 9, run: 9 }];
    let state = decode_coeff_block(&mut bins, CoeffPlane::FieldChroma, &mut out).unwrap();

    assert_eq!(out, vec![RunLevel { level: 1, run: 63 }]);
    assert_eq!(state.position, 64);
    assert!(
        !bins
            .calls
            .iter()
            .any(|c| matches!(c, BinCall::Weighted(..)))
    );
    bins.assert_drained();
}

#[test]
fn test_coeff_block_run_overflow() {
    let mut script = vec![1u8, 0];
    script.extend(std::iter::repeat_n(0, 62));
    script.push(1); // run=62, position=63
    script.extend([0, 1, 0, 0]); // 非 EOB, level=1, 正号, run 至少为 1
    let mut bins = ScriptedBins::new(&script);
    let mut out = Vec::new();
    let err = decode_coeff_block(&mut bins, CoeffPlane::FrameChroma, &mut out).unwrap_err();
    assert!(matches!(
        err,
        TaoError::SyntaxOutOfRange {
            value: 1,
            limit: 0,
            ..
        }
    ));
}

#[test]
fn test_coeff_block_large_level_contexts() {
    // level=5 -> primary index 4, 后续 EOB 使用 base + 11
    let mut script = vec![0u8, 0, 0, 0, 1, 0, 1];
    script.push(1); // EOB
    let mut bins = ScriptedBins::new(&script);
    let mut out = Vec::new();
    let state = decode_coeff_block(&mut bins, CoeffPlane::FieldLuma, &mut out).unwrap();
    assert_eq!(out, vec![RunLevel { level: 5, run: 0 }]);
    assert_eq!(state.primary_index, 4);
    assert_eq!(
        bins.calls.last(),
        Some(&BinCall::Weighted(190 + 11, 190 + 14))
    );
    // level>1 时 run 使用偏移 2 的上下文
    assert!(bins.calls.contains(&BinCall::Ctx(190 + 46 + 2)));
}

#[test]
fn test_coeff_level_overflow() {
    let mut bins = ScriptedBins::new(&vec![0u8; 2100]);
    let mut out = Vec::new();
    let err = decode_coeff_block(&mut bins, CoeffPlane::FrameLuma, &mut out).unwrap_err();
    assert!(matches!(
        err,
        TaoError::SyntaxOutOfRange {
            value: 2049,
            limit: MAX_COEFF_LEVEL,
            ..
        }
    ));
    assert!(out.is_empty());
}

// ============================================================
// 真实引擎
// ============================================================

#[test]
fn test_session_contexts_start_reset() {
    let data = [0x5Au8; 16];
    let dec = AecDecoder::new(BitReader::new(&data)).unwrap();
    assert!(dec.contexts().iter().all(|c| *c == AecContext::default()));
    assert_eq!(dec.registers().range_t, 0xFF);
}

#[test]
fn test_from_slice_data_skips_alignment_bits() {
    let data = [0xFFu8, 0xFF, 0xFF, 0xFF];
    let mut reader = BitReader::new(&data);
    reader.skip_bits(3).unwrap();
    let dec = AecDecoder::from_slice_data(reader).unwrap();
    assert_eq!(dec.engine().bits_read(), 8 + 9);
}

#[test]
fn test_symbol_updates_only_its_context() {
    let data = [0xFFu8; 8];
    let mut dec = AecDecoder::new(BitReader::new(&data)).unwrap();
    // 与旁路判决相同的概率, 首次判决落入 LPS
    assert!(dec.decode_symbol(40).unwrap());
    for (idx, ctx) in dec.contexts().iter().enumerate() {
        if idx == 40 {
            assert!(ctx.mps);
            assert_eq!(ctx.lg_pmps, 827);
            assert_eq!(ctx.cycno, 1);
        } else {
            assert_eq!(*ctx, AecContext::default());
        }
    }
}

#[test]
fn test_weighted_symbol_updates_both_contexts() {
    let data = [0xFFu8; 8];
    let mut dec = AecDecoder::new(BitReader::new(&data)).unwrap();
    let bin = dec.decode_symbol_weighted(60, 73).unwrap();
    let expected = {
        let mut ctx = AecContext::default();
        ctx.update(bin);
        ctx
    };
    assert_eq!(dec.contexts()[60], expected);
    assert_eq!(dec.contexts()[73], expected);
}
