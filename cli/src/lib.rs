// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod server;

const GATEWAY_LOGO: [&str; 5] = [
    "██┐     ██┐     ███┐   ███┐     ██████┐  █████┐ ████████┐███████┐██┐    ██┐ █████┐ ██┐   ██┐",
    "██│     ██│     ████┐ ████│    ██┌────┘ ██┌──██┐└──██┌──┘██┌────┘██│    ██│██┌──██┐└██┐ ██┌┘",
    "██│     ██│     ██┌████┌██│    ██│  ███┐███████│   ██│   █████┐  ██│ █┐ ██│███████│ └████┌┘ ",
    "██│     ██│     ██│└██┌┘██│    ██│   ██│██┌──██│   ██│   ██┌──┘  ██│███┐██│██┌──██│  └██┌┘  ",
    "███████┐███████┐██│ └─┘ ██│    └██████┌┘██│  ██│   ██│   ███████┐└███┌███┌┘██│  ██│   ██│   ",
];

/// The gateway logo rendered with a horizontal color gradient
pub fn get_gateway_logo() -> String {
    use owo_colors::OwoColorize;

    let gradient_start = (0x1F, 0x4E, 0xD8);
    let gradient_end = (0x6F, 0xD3, 0xFF);
    let shadow_color = (0x4A, 0x5A, 0x7A);

    let mut result = String::new();

    for line in GATEWAY_LOGO.iter() {
        let line_length = line.chars().filter(|c| *c == '█').count();
        let mut main_char_index = 0;

        for ch in line.chars() {
            if ch == '█' {
                let position = if line_length > 1 {
                    main_char_index as f32 / (line_length - 1) as f32
                } else {
                    0.0
                };

                let lerp = |from: u8, to: u8| (from as f32 + (to as f32 - from as f32) * position) as u8;
                let (r, g, b) = (
                    lerp(gradient_start.0, gradient_end.0),
                    lerp(gradient_start.1, gradient_end.1),
                    lerp(gradient_start.2, gradient_end.2),
                );

                result.push_str(&format!("{}", ch.truecolor(r, g, b)));
                main_char_index += 1;
            } else if ch == ' ' {
                result.push(ch);
            } else {
                result.push_str(&format!(
                    "{}",
                    ch.truecolor(shadow_color.0, shadow_color.1, shadow_color.2)
                ));
            }
        }
        result.push('\n');
    }

    result
}
