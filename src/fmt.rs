/// Format a float as Brazilian Real with thousands separators: R$ 1.234,56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}
