use serde::{Deserialize, Serialize};

/// 按住按钮与自动登出计时器的接线方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldMode {
    /// 松开时启动计时，按下时取消（按住保持在线）
    #[default]
    DeadMan,
    /// 按下时启动计时，提前松开则取消（长按登出）
    LongPress,
}

/// 按钮动作对计时器的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldAction {
    Arm,
    Disarm,
}

impl HoldMode {
    pub fn on_press(&self) -> HoldAction {
        match self {
            HoldMode::DeadMan => HoldAction::Disarm,
            HoldMode::LongPress => HoldAction::Arm,
        }
    }

    pub fn on_release(&self) -> HoldAction {
        match self {
            HoldMode::DeadMan => HoldAction::Arm,
            HoldMode::LongPress => HoldAction::Disarm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_mirror_images() {
        assert_eq!(HoldMode::DeadMan.on_press(), HoldAction::Disarm);
        assert_eq!(HoldMode::DeadMan.on_release(), HoldAction::Arm);
        assert_eq!(HoldMode::LongPress.on_press(), HoldAction::Arm);
        assert_eq!(HoldMode::LongPress.on_release(), HoldAction::Disarm);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&HoldMode::LongPress).unwrap(),
            "\"long_press\""
        );
        assert_eq!(
            serde_json::from_str::<HoldMode>("\"dead_man\"").unwrap(),
            HoldMode::DeadMan
        );
    }
}
