mod embedded;
mod fixed;
mod frame_budget;
mod ias15;
mod straight_lines;
