//! Last-commanded setpoints, as held by the codec's parameter store.
//!
//! Updates are expressed as separate `*Update` values that are merged into a
//! copy of the stored parameters, so a failed encode never leaves the store
//! half written.

use serde::{Deserialize, Serialize};

/// Setpoints for source (power supply) operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceParams {
    pub u: f64,
    pub i: f64,
    /// `None` derives the power limit as `u * i` on every encode.
    pub p: Option<f64>,
    pub r: f64,
}

impl SourceParams {
    pub fn power(&self) -> f64 {
        self.p.unwrap_or(self.u * self.i)
    }

    pub fn merged(mut self, update: SourceUpdate) -> Self {
        if let Some(u) = update.u {
            self.u = u;
        }
        if let Some(i) = update.i {
            self.i = i;
        }
        if let Some(p) = update.p {
            self.p = Some(p);
        }
        self.r = update.r.unwrap_or(0.0);
        self
    }
}

/// Setpoints for sink (electronic load) operation. The sink shares the
/// voltage rail with the source, so it carries no voltage of its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkParams {
    pub i: f64,
    pub p: f64,
    pub r: f64,
}

impl SinkParams {
    pub fn merged(mut self, update: SinkUpdate) -> Self {
        if let Some(i) = update.i {
            self.i = i;
        }
        if let Some(p) = update.p {
            self.p = p;
        }
        self.r = update.r.unwrap_or(0.0);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusParams {
    pub remote_control: bool,
    pub output: bool,
}

impl Default for StatusParams {
    fn default() -> Self {
        Self {
            remote_control: true,
            output: false,
        }
    }
}

/// Partial update of [`SourceParams`].
///
/// `u`, `i` and `p` keep their stored value when `None`. `r` does not: the
/// device treats a missing resistance ratio as 0, so `None` resets it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceUpdate {
    pub u: Option<f64>,
    pub i: Option<f64>,
    pub p: Option<f64>,
    pub r: Option<f64>,
}

impl SourceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u(mut self, u: f64) -> Self {
        self.u = Some(u);
        self
    }

    pub fn i(mut self, i: f64) -> Self {
        self.i = Some(i);
        self
    }

    pub fn p(mut self, p: f64) -> Self {
        self.p = Some(p);
        self
    }

    pub fn r(mut self, r: f64) -> Self {
        self.r = Some(r);
        self
    }
}

/// Partial update of [`SinkParams`]. A voltage is forwarded to the source
/// setpoints since both share one rail. `r` resets to 0 when `None`, as in
/// [`SourceUpdate`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SinkUpdate {
    pub u: Option<f64>,
    pub i: Option<f64>,
    pub p: Option<f64>,
    pub r: Option<f64>,
}

impl SinkUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u(mut self, u: f64) -> Self {
        self.u = Some(u);
        self
    }

    pub fn i(mut self, i: f64) -> Self {
        self.i = Some(i);
        self
    }

    pub fn p(mut self, p: f64) -> Self {
        self.p = Some(p);
        self
    }

    pub fn r(mut self, r: f64) -> Self {
        self.r = Some(r);
        self
    }
}
