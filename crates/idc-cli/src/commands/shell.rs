pub fn shell() {
    println!("`idc shell` is not supported. Use `docker exec -it <container> bash` instead.");
}
