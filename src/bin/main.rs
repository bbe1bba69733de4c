fn main() {
    pickaxe::main()
}
