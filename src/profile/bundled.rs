//! Profiles shipped inside the binary.

pub const BUNDLED_PROFILES: &[(&str, &str)] = &[
    (
        "babeltrace-stable-1.4",
        include_str!("../../profiles/babeltrace-stable-1.4.yml"),
    ),
    ("elfutils-0.166", include_str!("../../profiles/elfutils-0.166.yml")),
    (
        "lttng-stable-2.8",
        include_str!("../../profiles/lttng-stable-2.8.yml"),
    ),
    ("lttng-ust-java", include_str!("../../profiles/lttng-ust-java.yml")),
    (
        "no-lttng-modules",
        include_str!("../../profiles/no-lttng-modules.yml"),
    ),
    ("urcu-master", include_str!("../../profiles/urcu-master.yml")),
];
