// 终端前端：行命令输入，事件总线驱动输出

pub mod terminal;

pub use terminal::run_terminal;
