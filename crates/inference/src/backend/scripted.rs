//! Deterministic backend driven by a JSON "model" file.
//!
//! Lets the engine and everything above it run without ONNX Runtime. The artifact
//! path doubles as the key of a [`Probe`] that records loads and concurrent
//! `infer` calls, so tests can observe a backend the engine owns.

use super::{ExecutionProvider, InferenceBackend, InferenceOutput};
use anyhow::Context;
use ndarray::{Array, Array3, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

static PROBES: LazyLock<Mutex<HashMap<PathBuf, Arc<Probe>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedPrediction {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub class_id: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub fail: bool,
    #[serde(default)]
    pub panic: bool,
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
    /// Zero-score anchors are padded up to this count.
    #[serde(default = "default_anchors")]
    pub anchors: usize,
    #[serde(default)]
    pub predictions: Vec<ScriptedPrediction>,
}

fn default_num_classes() -> usize {
    2
}

fn default_anchors() -> usize {
    64
}

impl Default for Script {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            fail: false,
            panic: false,
            num_classes: default_num_classes(),
            anchors: default_anchors(),
            predictions: Vec::new(),
        }
    }
}

impl Script {
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Output tensor in the channels-first `[1, 4 + nc, anchors]` layout.
    fn predictions_tensor(&self) -> anyhow::Result<Array3<f32>> {
        let anchors = self.anchors.max(self.predictions.len());
        let features = 4 + self.num_classes;
        let mut out = Array3::<f32>::zeros((1, features, anchors));

        for (a, p) in self.predictions.iter().enumerate() {
            anyhow::ensure!(
                p.class_id < self.num_classes,
                "scripted class {} out of range for {} classes",
                p.class_id,
                self.num_classes
            );
            out[[0, 0, a]] = p.cx;
            out[[0, 1, a]] = p.cy;
            out[[0, 2, a]] = p.w;
            out[[0, 3, a]] = p.h;
            out[[0, 4 + p.class_id, a]] = p.score;
        }

        Ok(out)
    }
}

/// Counters shared by every backend loaded from the same path.
#[derive(Debug, Default)]
pub struct Probe {
    loads: AtomicUsize,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Probe {
    pub fn for_path(path: &Path) -> Arc<Probe> {
        let mut probes = PROBES.lock().unwrap_or_else(|e| e.into_inner());
        probes.entry(path.to_path_buf()).or_default().clone()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `infer` calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveCall<'a>(&'a Probe);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ScriptedBackend {
    script: Script,
    probe: Arc<Probe>,
}

impl InferenceBackend for ScriptedBackend {
    fn load_model(path: &Path, _provider: ExecutionProvider) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("reading scripted model {}", path.display()))?;
        let script: Script = serde_json::from_slice(&raw).context("parsing scripted model")?;

        let probe = Probe::for_path(path);
        probe.loads.fetch_add(1, Ordering::SeqCst);

        Ok(Self { script, probe })
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        anyhow::ensure!(
            images.ndim() == 4 && images.shape()[1] == 3,
            "expected [1, 3, H, W] input, got {:?}",
            images.shape()
        );

        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveCall(&self.probe);
        self.probe.peak.fetch_max(now_active, Ordering::SeqCst);

        if self.script.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.script.delay_ms));
        }
        if self.script.panic {
            panic!("scripted backend panic");
        }
        if self.script.fail {
            anyhow::bail!("scripted inference failure");
        }

        Ok(InferenceOutput {
            predictions: self.script.predictions_tensor()?.into_dyn(),
        })
    }
}
