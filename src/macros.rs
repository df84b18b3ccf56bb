macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!([]);
        $name!([T1]);
        $name!([T1, T2]);
        $name!([T1, T2, T3]);
        $name!([T1, T2, T3, T4]);
        $name!([T1, T2, T3, T4, T5]);
        $name!([T1, T2, T3, T4, T5, T6]);
        $name!([T1, T2, T3, T4, T5, T6, T7]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12]);
    };
}

/// Registers converters from the textual representations (`String` and `&'static str`) of a value
/// and to `String` for each listed type.
macro_rules! register_parse_converters {
    ($helper:expr, [$($ty:ty),* $(,)?]) => {
        $(
            $helper.register_converter::<$ty, _>(|bean: &$crate::Bean| {
                let text = $crate::conversion::text_of(bean)
                    .ok_or_else(|| anyhow::anyhow!("unsupported source type `{}`", bean.type_info()))?;
                text.trim().parse::<$ty>().map_err(|err| anyhow::anyhow!("cannot parse `{text}`: {err}"))
            });
        )*
    };
}
