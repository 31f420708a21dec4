//! 为离焦距离回归网络准备训练数据: 焦平面估计, 设计矩阵计算与缓存, 训练/验证划分.

mod loader;
mod runner;

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("Logger initialization error");
    if let Err(e) = runner::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
