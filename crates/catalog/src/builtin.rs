use shared::{domain::TaskId, protocol::Task};

fn steps(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn tasks() -> Vec<Task> {
    vec![
        Task {
            id: TaskId(1),
            title: "Numerical Reasoning".to_string(),
            initial_prompt: "A used book costs ₹100, which includes a 10% tax. What is the base price before tax?".to_string(),
            assistance: steps(&[
                "Total (₹100) = Base (100%) + Tax (10%).",
                "Ratio: 110% = 100, so Base = 100 / 1.10.",
                "Result: ₹90.91",
            ]),
            update_prompt: "SITUATION UPDATE: A 10% student discount is applied to the BASE price (₹90.91) first, then the 10% tax is added back. What is the final price?".to_string(),
            choices: None,
        },
        Task {
            id: TaskId(2),
            title: "Perspective Switching".to_string(),
            initial_prompt: "The University is using AI cameras to track 'Study Habits' to improve library efficiency. Provide 3 keywords that justify this from the University's perspective.".to_string(),
            assistance: steps(&["Optimization", "Data-driven", "Efficiency"]),
            update_prompt: "UPDATE: Due to privacy concerns, cameras are now only for 'Security' (theft prevention). Which choice best represents a Student's balanced view?".to_string(),
            choices: Some(steps(&[
                "I support theft prevention but demand privacy protection.",
                "The university should use cameras to track my study habits.",
                "Cameras are unnecessary for security.",
                "I prefer the efficiency tracking over security.",
            ])),
        },
        Task {
            id: TaskId(3),
            title: "Logic Adaptation".to_string(),
            initial_prompt: "Solve the fox-chicken-grain river crossing problem. Find the minimum crossings.".to_string(),
            assistance: steps(&[
                "Chicken first (1), return (2).",
                "Grain across (3), Chicken back (4).",
                "Fox across (5), return (6).",
                "Chicken across (7). Result: 7.",
            ]),
            update_prompt: "SITUATION UPDATE: A raft is found that allows the grain to be left floating separately. Recalculate minimum crossings.".to_string(),
            choices: None,
        },
        Task {
            id: TaskId(4),
            title: "Financial Pivot".to_string(),
            initial_prompt: "₹1,00,000 moved to a 0% wallet from a 4% bank account. Calculate the annual opportunity cost.".to_string(),
            assistance: steps(&[
                "Interest: 1,00,000 * 4% = 4,000.",
                "Bank (4,000) vs Wallet (0).",
                "Result: ₹4,000 loss.",
            ]),
            update_prompt: "SITUATION UPDATE: The wallet now offers ₹500 cashback per ₹10,000 held. Which is more profitable: Bank (4% interest) or Wallet (Cashback)?".to_string(),
            choices: None,
        },
    ]
}
