//! 会话状态
//!
//! 单个批次会话依次经过的状态，失败时记录停在哪一步

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Init,
    LoggedIn,
    FormReady,
    FieldCleared,
    CodesInserted,
    Submitted,
    ResultsReady,
    ExportClicked,
    Downloaded,
    Renamed,
    Done,
    Failed,
}

impl SessionState {
    /// 正常流程中的下一个状态
    pub fn next(self) -> SessionState {
        use SessionState::*;
        match self {
            Init => LoggedIn,
            LoggedIn => FormReady,
            FormReady => FieldCleared,
            FieldCleared => CodesInserted,
            CodesInserted => Submitted,
            Submitted => ResultsReady,
            ResultsReady => ExportClicked,
            ExportClicked => Downloaded,
            Downloaded => Renamed,
            Renamed => Done,
            Done => Done,
            Failed => Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// 日志用的中文描述
    pub fn label(self) -> &'static str {
        use SessionState::*;
        match self {
            Init => "初始化",
            LoggedIn => "已登录",
            FormReady => "查询页就绪",
            FieldCleared => "输入框已清空",
            CodesInserted => "编码已写入",
            Submitted => "已提交",
            ResultsReady => "结果已生成",
            ExportClicked => "已点击导出",
            Downloaded => "已下载",
            Renamed => "已改名",
            Done => "完成",
            Failed => "失败",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
