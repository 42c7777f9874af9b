// Code generated by rgo; DO NOT EDIT.
// rgo:digest pack_sexp_N6PersonE 26386ec81e18d0f3331d6a84c0287e46e559f8c9c8475689b196ba74bd4cca88 crate::model::Person
// rgo:digest pack_sexp_SN6PersonE d936669ddd40ad2492c22eec96553c55f4ed442ce9d614df42d7f2cb58f49b74 Vec<crate::model::Person>
// rgo:digest pack_sexp_i32 39e28e89a7fb18b58f8092d7a9ac8165d5101d6ad877a58b28f6dd0778760271 i32
// rgo:digest pack_sexp_str f64637416b3420a6af77350b3855ee77388237e6841314fb7ebe317e63be5031 String

#[allow(non_snake_case)]
pub fn pack_sexp_N6PersonE(cx: &::rgo_runtime::Context<'_>, p: &crate::model::Person) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::pairlist_struct(cx, &["Name", "Age"], |cx, i| match i {
        0 => pack_sexp_str(cx, &p.name),
        1 => pack_sexp_i32(cx, &p.age),
        _ => ::rgo_runtime::pack::nil(cx),
    })
}

#[allow(non_snake_case)]
pub fn pack_sexp_SN6PersonE(cx: &::rgo_runtime::Context<'_>, p: &[crate::model::Person]) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::list(cx, p, |cx, x| pack_sexp_N6PersonE(cx, x))
}

#[allow(non_snake_case)]
pub fn pack_sexp_i32(cx: &::rgo_runtime::Context<'_>, p: &i32) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::integer(cx, *p)
}

#[allow(non_snake_case)]
pub fn pack_sexp_str(cx: &::rgo_runtime::Context<'_>, p: &str) -> ::rgo_runtime::Value {
    ::rgo_runtime::pack::string(cx, p)
}
