fn main() {
    ball_ide_lib::run()
}
