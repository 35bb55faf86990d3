//! Edit-plan-to-filter-graph compiler.
//!
//! Translates a validated plan plus per-clip metadata into a single
//! FFmpeg invocation. Filter chains are built as ordered lists of
//! primitive operations and joined exactly once, with pad labels
//! generated programmatically; nothing here concatenates
//! partially-formed filter fragments.

use std::path::Path;

use liveedit_models::{AudioOverlaySpec, ResolvedPlan, StagedAsset};

use crate::command::FfmpegCommand;
use crate::probe::ClipInfo;

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Used when no override is given and the first clip could not be
/// probed for dimensions.
const FALLBACK_RESOLUTION: Resolution = Resolution {
    width: 854,
    height: 480,
};

/// A staged clip plus its probed metadata, in upload order.
#[derive(Debug, Clone)]
pub struct ClipSource {
    pub asset: StagedAsset,
    pub info: ClipInfo,
}

/// One labeled filter chain: `[input]op,op,...[output]`.
///
/// Operations are collected as discrete strings and joined once at
/// render time; the labels bracket the chain so a malformed fragment
/// cannot leak into a neighbor.
#[derive(Debug)]
struct FilterChain {
    input: String,
    ops: Vec<String>,
    output: String,
}

impl FilterChain {
    fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ops: Vec::new(),
            output: output.into(),
        }
    }

    fn push(&mut self, op: impl Into<String>) {
        self.ops.push(op.into());
    }

    fn render(&self) -> String {
        format!("[{}]{}[{}]", self.input, self.ops.join(","), self.output)
    }
}

/// Format seconds without trailing zeros (`5` not `5.000`).
fn secs(v: f64) -> String {
    format!("{}", v)
}

/// Effective duration of a resolved clip after trimming.
fn effective_duration(info: &ClipInfo, start: Option<f64>, end: Option<f64>) -> f64 {
    let start = start.unwrap_or(0.0).max(0.0);
    let end = end.unwrap_or(info.duration).min(info.duration.max(start));
    (end - start).max(0.0)
}

/// Compile a validated plan into a single FFmpeg command.
///
/// `clips` is the staged set in upload order; the plan's resolved
/// order selects and sequences them. The optional overlay track is
/// appended as the last input. The plan must come from
/// `EditPlan::resolve`, which is the validation gate for clip
/// indices, trim ranges and clip-count limits.
pub fn compile(
    clips: &[ClipSource],
    plan: &ResolvedPlan,
    audio: Option<&AudioOverlaySpec>,
    target: Option<Resolution>,
    output: &Path,
) -> FfmpegCommand {
    let n = plan.clips.len();

    // Common target resolution: explicit override, else the first
    // clip in playback order, else the fallback. Every video chain
    // ends with a scale to this size so concat cannot fail on
    // mismatched dimensions.
    let target = target
        .or_else(|| {
            plan.clips.first().and_then(|rc| {
                let info = &clips[rc.source_index].info;
                (info.width > 0 && info.height > 0).then_some(Resolution {
                    width: info.width,
                    height: info.height,
                })
            })
        })
        .unwrap_or(FALLBACK_RESOLUTION);

    let mut chains: Vec<String> = Vec::new();
    let mut durations: Vec<f64> = Vec::with_capacity(n);

    for (i, rc) in plan.clips.iter().enumerate() {
        let info = &clips[rc.source_index].info;
        durations.push(effective_duration(info, rc.start, rc.end));

        let mut v = FilterChain::new(format!("{}:v", i), format!("v{}", i));
        let mut a = FilterChain::new(format!("{}:a", i), format!("a{}", i));

        if rc.start.is_some() || rc.end.is_some() {
            let mut trim_args = Vec::new();
            if let Some(start) = rc.start {
                trim_args.push(format!("start={}", secs(start)));
            }
            if let Some(end) = rc.end {
                trim_args.push(format!("end={}", secs(end)));
            }
            let trim_args = trim_args.join(":");
            v.push(format!("trim={}", trim_args));
            a.push(format!("atrim={}", trim_args));
        }

        // Reset timestamps so trimmed/reordered segments start at zero
        v.push("setpts=PTS-STARTPTS");
        a.push("asetpts=PTS-STARTPTS");
        v.push(format!("scale={}:{}", target.width, target.height));

        chains.push(v.render());
        chains.push(a.render());
    }

    // Merge the labeled pads into one video and one audio stream.
    let (merged_v, merged_a) = if n == 1 {
        ("v0".to_string(), "a0".to_string())
    } else if plan.crossfades.is_empty() {
        let concat_inputs: String = (0..n).map(|i| format!("[v{i}][a{i}]")).collect();
        chains.push(format!(
            "{}concat=n={}:v=1:a=1[vout][aout]",
            concat_inputs, n
        ));
        ("vout".to_string(), "aout".to_string())
    } else {
        // Fold clip pads pairwise: xfade/acrossfade where the plan
        // asks for a transition at that boundary, two-way concat
        // otherwise. The xfade offset is the running output duration
        // minus the fade length.
        let mut cur_v = "v0".to_string();
        let mut cur_a = "a0".to_string();
        let mut cur_dur = durations[0];

        for pos in 0..n - 1 {
            let next_v = format!("v{}", pos + 1);
            let next_a = format!("a{}", pos + 1);
            let next_dur = durations[pos + 1];

            match plan.crossfade_at(pos) {
                Some(requested) => {
                    let d = requested.min(cur_dur).min(next_dur);
                    let offset = (cur_dur - d).max(0.0);
                    let out_v = format!("vx{}", pos);
                    let out_a = format!("ax{}", pos);
                    chains.push(format!(
                        "[{cur_v}][{next_v}]xfade=transition=fade:duration={}:offset={}[{out_v}]",
                        secs(d),
                        secs(offset)
                    ));
                    chains.push(format!(
                        "[{cur_a}][{next_a}]acrossfade=d={}[{out_a}]",
                        secs(d)
                    ));
                    cur_dur = cur_dur + next_dur - d;
                    cur_v = out_v;
                    cur_a = out_a;
                }
                None => {
                    let out_v = format!("vc{}", pos);
                    let out_a = format!("ac{}", pos);
                    chains.push(format!(
                        "[{cur_v}][{cur_a}][{next_v}][{next_a}]concat=n=2:v=1:a=1[{out_v}][{out_a}]"
                    ));
                    cur_dur += next_dur;
                    cur_v = out_v;
                    cur_a = out_a;
                }
            }
        }
        (cur_v, cur_a)
    };

    // Optional overlay: duck the merged program audio for the mix
    // window and delay the overlay to its start offset. The mix is
    // bounded by the program (`duration=first`), so the overlay never
    // extends the output.
    let final_a = if let Some(spec) = audio {
        let start = plan.audio_start.unwrap_or(spec.start_secs).max(0.0);
        let duck_db = plan.audio_duck_db.unwrap_or(spec.duck_db);
        let overlay_pad = format!("{}:a", n);
        let delay_ms = (start * 1000.0).round() as i64;

        let program = if duck_db < 0.0 {
            let gain = 10f64.powf(duck_db / 20.0);
            chains.push(format!("[{merged_a}]volume={:.2}[orig_audio]", gain));
            "orig_audio".to_string()
        } else {
            merged_a
        };

        chains.push(format!(
            "[{overlay_pad}]adelay={delay_ms}|{delay_ms}[effect_audio]"
        ));
        chains.push(format!(
            "[{program}][effect_audio]amix=inputs=2:duration=first[audio]"
        ));
        "audio".to_string()
    } else {
        merged_a
    };

    let mut cmd = FfmpegCommand::new(output);
    for rc in &plan.clips {
        cmd = cmd.input(&clips[rc.source_index].asset.path);
    }
    if let Some(spec) = audio {
        cmd = cmd.input(&spec.asset.path);
    }

    cmd.filter_complex(chains.join(";"))
        .map(format!("[{}]", merged_v))
        .map(format!("[{}]", final_a))
        .video_codec("libx264")
        .preset("medium")
        .crf(23)
        .pix_fmt("yuv420p")
        .audio_codec("aac")
        .audio_bitrate("128k")
        .movflags("+faststart")
}
