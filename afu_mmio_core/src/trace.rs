//! Stimulus traces: a scripted host driving the controller tick by tick.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::mmio::{MmioController, Request};

/// 16-bit MMIO address, serialized as four hex digits.
#[derive(Serialize, Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct HexAddress {
    #[serde(with = "hex::serde")]
    value: [u8; 2],
}

impl From<u16> for HexAddress {
    fn from(value: u16) -> Self {
        HexAddress {
            value: value.to_be_bytes(),
        }
    }
}

impl From<HexAddress> for u16 {
    fn from(value: HexAddress) -> Self {
        u16::from_be_bytes(value.value)
    }
}

/// 64-bit data word, serialized as sixteen hex digits.
#[derive(Serialize, Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct HexWord {
    #[serde(with = "hex::serde")]
    value: [u8; 8],
}

impl From<u64> for HexWord {
    fn from(value: u64) -> Self {
        HexWord {
            value: value.to_be_bytes(),
        }
    }
}

impl From<HexWord> for u64 {
    fn from(value: HexWord) -> Self {
        u64::from_be_bytes(value.value)
    }
}

impl Display for HexWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", u64::from(*self))
    }
}

fn one() -> usize {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stimulus {
    Write {
        address: HexAddress,
        data: HexWord,
    },
    Read {
        address: HexAddress,
        #[serde(default)]
        transaction_id: u16,
    },
    Idle {
        #[serde(default = "one")]
        ticks: usize,
    },
    Reset {
        #[serde(default = "one")]
        ticks: usize,
    },
}

impl Stimulus {
    /// The (reset, request) pairs this step drives, one per tick.
    fn ticks(&self) -> impl Iterator<Item = (bool, Request)> {
        let (count, reset, request) = match *self {
            Stimulus::Write { address, data } => {
                (1, false, Request::write(address.into(), data.into()))
            }
            Stimulus::Read {
                address,
                transaction_id,
            } => (1, false, Request::read(address.into(), transaction_id)),
            Stimulus::Idle { ticks } => (ticks, false, Request::idle()),
            Stimulus::Reset { ticks } => (ticks, true, Request::idle()),
        };
        std::iter::repeat_n((reset, request), count)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedResponse {
    pub tick: u64,
    #[serde(default)]
    pub transaction_id: Option<u16>,
    pub data: HexWord,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub steps: Vec<Stimulus>,
    #[serde(default)]
    pub expect: Vec<ExpectedResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedResponse {
    pub tick: u64,
    pub transaction_id: u16,
    pub data: HexWord,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    Missing {
        tick: u64,
    },
    Data {
        tick: u64,
        expected: HexWord,
        actual: HexWord,
    },
    TransactionId {
        tick: u64,
        expected: u16,
        actual: u16,
    },
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::Missing { tick } => write!(f, "tick {tick}: no valid response"),
            Mismatch::Data {
                tick,
                expected,
                actual,
            } => write!(f, "tick {tick}: expected data {expected}, got {actual}"),
            Mismatch::TransactionId {
                tick,
                expected,
                actual,
            } => write!(
                f,
                "tick {tick}: expected transaction id {expected:#x}, got {actual:#x}"
            ),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceRun {
    pub responses: Vec<ObservedResponse>,
    pub mismatches: Vec<Mismatch>,
}

impl TraceRun {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Clock `controller` through every step of `trace`, then idle until the
/// pipeline has drained, and check the valid responses against the trace's
/// expectations. Ticks are the controller's own tick numbers.
pub fn run_trace(controller: &mut MmioController, trace: &Trace) -> TraceRun {
    let drain = Stimulus::Idle {
        ticks: controller.read_latency(),
    };

    let mut run = TraceRun::default();
    for (reset, request) in trace.steps.iter().chain([&drain]).flat_map(Stimulus::ticks) {
        let tick = controller.tick();
        let response = controller.clock(reset, &request);
        if response.read_valid {
            run.responses.push(ObservedResponse {
                tick,
                transaction_id: response.transaction_id,
                data: response.data.into(),
            });
        }
    }

    for expected in &trace.expect {
        let Some(actual) = run.responses.iter().find(|r| r.tick == expected.tick) else {
            run.mismatches.push(Mismatch::Missing {
                tick: expected.tick,
            });
            continue;
        };
        if actual.data != expected.data {
            run.mismatches.push(Mismatch::Data {
                tick: expected.tick,
                expected: expected.data,
                actual: actual.data,
            });
        }
        if let Some(tid) = expected.transaction_id {
            if tid != actual.transaction_id {
                run.mismatches.push(Mismatch::TransactionId {
                    tick: expected.tick,
                    expected: tid,
                    actual: actual.transaction_id,
                });
            }
        }
    }

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MmioConfig;

    #[test]
    fn hex_values_round_through_json() {
        let step: Stimulus = serde_json::from_str(
            r#"{ "op": "write", "address": "0080", "data": "000000000000beef" }"#,
        )
        .unwrap();

        assert_eq!(
            step,
            Stimulus::Write {
                address: 0x0080.into(),
                data: 0xBEEF.into(),
            }
        );
    }

    #[test]
    fn repeat_counts_default_to_one() {
        let steps: Vec<Stimulus> =
            serde_json::from_str(r#"[{ "op": "idle" }, { "op": "reset", "ticks": 3 }]"#).unwrap();

        assert_eq!(steps[0], Stimulus::Idle { ticks: 1 });
        assert_eq!(steps[1].ticks().count(), 3);
        assert!(steps[1].ticks().all(|(reset, _)| reset));
    }

    #[test]
    fn missing_and_wrong_responses_are_reported() {
        let mut controller = MmioController::new(&MmioConfig::default()).unwrap();
        let trace = Trace {
            steps: vec![
                Stimulus::Write {
                    address: 0x0024.into(),
                    data: 5.into(),
                },
                Stimulus::Read {
                    address: 0x0024.into(),
                    transaction_id: 9,
                },
            ],
            expect: vec![
                ExpectedResponse {
                    tick: 4,
                    transaction_id: Some(8),
                    data: 6.into(),
                },
                ExpectedResponse {
                    tick: 5,
                    transaction_id: None,
                    data: 0.into(),
                },
            ],
        };

        let run = run_trace(&mut controller, &trace);

        assert_eq!(run.responses.len(), 1);
        assert_eq!(
            run.mismatches,
            vec![
                Mismatch::Data {
                    tick: 4,
                    expected: 6.into(),
                    actual: 5.into(),
                },
                Mismatch::TransactionId {
                    tick: 4,
                    expected: 8,
                    actual: 9,
                },
                Mismatch::Missing { tick: 5 },
            ]
        );
        assert!(!run.passed());
    }
}
