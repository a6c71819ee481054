//! 时间稳定器：同一候选读数连续出现 K 帧才锁定，锁定后直到 reset 前不再改变

use log::info;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StabilizerState {
    /// reset 之后，还没有见过候选
    #[default]
    Idle,
    Accumulating {
        candidate: String,
        count: u32,
        misses: u32,
    },
    Stable {
        reading: String,
    },
    /// 调用方已取走结果，reset 之前忽略所有帧
    Finalized {
        reading: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizerAction {
    /// 没有候选，继续等
    Wait,
    /// 候选已连续出现 n 帧
    Count(u32),
    /// 本帧刚好达到 K，锁定
    Latch,
    /// 已锁定，本帧不影响结果
    Hold,
    /// 已终结，本帧被丢弃
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizerConfig {
    pub stable_frames: u32,
    pub miss_tolerance: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            stable_frames: 5,
            miss_tolerance: 0,
        }
    }
}

impl StabilizerState {
    pub fn transition(
        &self,
        candidate: Option<&str>,
        config: &StabilizerConfig,
    ) -> (StabilizerState, StabilizerAction) {
        match self {
            StabilizerState::Stable { .. } => (self.clone(), StabilizerAction::Hold),

            StabilizerState::Finalized { .. } => (self.clone(), StabilizerAction::Ignore),

            StabilizerState::Idle => match candidate {
                None => (StabilizerState::Idle, StabilizerAction::Wait),
                Some(c) => Self::first_sighting(c, config),
            },

            StabilizerState::Accumulating {
                candidate: current,
                count,
                misses,
            } => match candidate {
                None => {
                    let misses = misses + 1;
                    if misses > config.miss_tolerance {
                        (StabilizerState::Idle, StabilizerAction::Wait)
                    } else {
                        (
                            StabilizerState::Accumulating {
                                candidate: current.clone(),
                                count: *count,
                                misses,
                            },
                            StabilizerAction::Wait,
                        )
                    }
                }
                Some(c) if c == current => {
                    let count = count + 1;
                    if count >= config.stable_frames {
                        (
                            StabilizerState::Stable {
                                reading: current.clone(),
                            },
                            StabilizerAction::Latch,
                        )
                    } else {
                        (
                            StabilizerState::Accumulating {
                                candidate: current.clone(),
                                count,
                                misses: 0,
                            },
                            StabilizerAction::Count(count),
                        )
                    }
                }
                // 候选变了：计数从 1 重新开始
                Some(c) => Self::first_sighting(c, config),
            },
        }
    }

    fn first_sighting(candidate: &str, config: &StabilizerConfig) -> (StabilizerState, StabilizerAction) {
        if config.stable_frames <= 1 {
            (
                StabilizerState::Stable {
                    reading: candidate.to_string(),
                },
                StabilizerAction::Latch,
            )
        } else {
            (
                StabilizerState::Accumulating {
                    candidate: candidate.to_string(),
                    count: 1,
                    misses: 0,
                },
                StabilizerAction::Count(1),
            )
        }
    }

    /// 已锁定（Stable 或 Finalized）的读数
    pub fn reading(&self) -> Option<&str> {
        match self {
            StabilizerState::Stable { reading } | StabilizerState::Finalized { reading } => {
                Some(reading)
            }
            _ => None,
        }
    }
}

pub struct Stabilizer {
    state: StabilizerState,
    config: StabilizerConfig,
    frame_counter: u64,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self::with_config(StabilizerConfig::default())
    }

    pub fn with_config(config: StabilizerConfig) -> Self {
        Self {
            state: StabilizerState::Idle,
            config,
            frame_counter: 0,
        }
    }

    pub fn process_frame(&mut self, candidate: Option<&str>) -> StabilizerAction {
        self.frame_counter += 1;

        let (new_state, action) = self.state.transition(candidate, &self.config);
        if action == StabilizerAction::Latch {
            info!(
                "✅ stable reading {:?} after {} frames",
                new_state.reading().unwrap_or_default(),
                self.frame_counter
            );
        }
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &StabilizerState {
        &self.state
    }

    pub fn reading(&self) -> Option<&str> {
        self.state.reading()
    }

    /// 正在累积的候选及其连续计数
    pub fn pending(&self) -> Option<(&str, u32)> {
        match &self.state {
            StabilizerState::Accumulating {
                candidate, count, ..
            } => Some((candidate.as_str(), *count)),
            _ => None,
        }
    }

    /// Stable → Finalized，返回锁定的读数；其它状态不变并返回 None
    pub fn finalize(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            StabilizerState::Stable { reading } => {
                info!("🏁 reading {:?} finalized", reading);
                self.state = StabilizerState::Finalized {
                    reading: reading.clone(),
                };
                Some(reading)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn reset(&mut self) {
        self.state = StabilizerState::Idle;
        self.frame_counter = 0;
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new()
    }
}
